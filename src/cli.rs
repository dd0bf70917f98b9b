use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{io_utils::parse_delimiter, naming::NamingPolicy};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Map CSV rows onto typed records",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the column name each naming policy derives from a field name
    Policies(PoliciesArgs),
    /// Report which header column each field binds to
    Resolve(ResolveArgs),
    /// Parse a CSV file into records described by a YAML mapping
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
pub struct PoliciesArgs {
    /// Field name to transform
    #[arg(short, long)]
    pub name: String,
    /// Policies to apply (defaults to every built-in policy)
    #[arg(short, long = "policy", value_parser = parse_policy, action = clap::ArgAction::Append)]
    pub policies: Vec<NamingPolicy>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Input CSV file whose header is resolved (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Comma-separated field names, in declaration order
    #[arg(short = 'f', long = "fields", value_delimiter = ',', required = true)]
    pub fields: Vec<String>,
    /// Header policies tried after exact matching, in order
    #[arg(short, long = "policy", value_parser = parse_policy, action = clap::ArgAction::Append)]
    pub policies: Vec<NamingPolicy>,
    /// Explicit column names, one per field
    #[arg(long = "names", value_delimiter = ',')]
    pub names: Vec<String>,
    /// Explicit zero-based column indices, one per field
    #[arg(long = "indices", value_delimiter = ',')]
    pub indices: Vec<usize>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Input CSV file to parse (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML mapping describing the record fields and parser settings
    #[arg(short, long)]
    pub mapping: PathBuf,
    /// Output format for parsed records
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Limit number of records printed
    #[arg(long)]
    pub limit: Option<usize>,
    /// Delimiter override (takes precedence over the mapping)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Encoding override (takes precedence over the mapping)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

fn parse_policy(value: &str) -> Result<NamingPolicy, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}

//! Map delimited text rows onto typed records.
//!
//! A record type declares its fields once through a [`record::FieldTable`];
//! a [`parser::CsvParserBuilder`] collects delimiter, naming policy, format,
//! column and identifier settings; [`parser::CsvParser`] then turns every data
//! row of an input into one record.
//!
//! ```
//! use csv_mapper::{CsvParser, FieldTable, NamingPolicy, Record};
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     name: String,
//!     time_of_day: String,
//! }
//!
//! impl Record for Person {
//!     fn field_table() -> FieldTable<Self> {
//!         FieldTable::new()
//!             .field("Name", |p: &mut Person, v: String| p.name = v)
//!             .field("TimeOfDay", |p: &mut Person, v: String| p.time_of_day = v)
//!     }
//! }
//!
//! let parser = CsvParser::<Person>::builder()
//!     .with_header_policies(|chain| chain.add_policy(NamingPolicy::PascalToSnake))
//!     .build()
//!     .unwrap();
//! let people = parser
//!     .parse(&mut "Name,time_of_day\nJohn,morning\n".as_bytes())
//!     .unwrap();
//! assert_eq!(people[0].time_of_day, "morning");
//! ```

pub mod cli;
pub mod convert;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod mapping;
pub mod naming;
pub mod parser;
pub mod record;
pub mod resolve;
pub mod table;

use std::{
    env,
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

pub use crate::{
    convert::TemporalKind,
    data::Value,
    error::{BuildError, ConversionError, Error, ResolutionError},
    naming::{NamingPolicies, NamingPolicy},
    parser::{CsvParser, CsvParserBuilder, EntitySink, ResolvedColumn},
    record::{CsvEnum, FieldKind, FieldTable, Record},
    resolve::ColumnStrategy,
};

use crate::{
    cli::{Cli, Commands, OutputFormat},
    io_utils::printable_delimiter,
    mapping::{FieldSpec, Mapping},
    table::Table,
};

static LOGGER: OnceLock<()> = OnceLock::new();

const MAX_CELL_WIDTH: usize = 48;

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_mapper", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Policies(args) => handle_policies(&args),
        Commands::Resolve(args) => handle_resolve(&args),
        Commands::Parse(args) => handle_parse(&args),
    }
}

fn handle_policies(args: &cli::PoliciesArgs) -> Result<()> {
    let policies = if args.policies.is_empty() {
        NamingPolicy::builtins()
    } else {
        args.policies.clone()
    };
    let mut table = Table::new(["policy", "candidate"]);
    for policy in &policies {
        table.push_row(vec![policy.to_string(), policy.apply(&args.name).into_owned()]);
    }
    table.print();
    Ok(())
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if io_utils::is_dash(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn handle_resolve(args: &cli::ResolveArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Resolving {} field(s) against '{}' using delimiter '{}'",
        args.fields.len(),
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let mapping = Mapping {
        fields: args
            .fields
            .iter()
            .map(|name| FieldSpec {
                name: name.trim().to_string(),
                datatype: "text".to_string(),
                members: Vec::new(),
            })
            .collect(),
        ..Mapping::default()
    };
    let policies = args.policies.clone();
    let mut builder = mapping
        .builder()?
        .with_delimiter(delimiter)
        .with_header_policies(|chain| policies.into_iter().fold(chain, NamingPolicies::add_policy));
    if let Some(encoding) = &args.input_encoding {
        builder = builder.with_encoding(encoding.clone());
    }
    if !args.names.is_empty() {
        builder = builder.with_column_names(args.names.iter().cloned());
    }
    if !args.indices.is_empty() {
        builder = builder.with_column_indices(args.indices.iter().copied());
    }
    let parser = builder.build().context("Configuring parser")?;

    let resolved = parser
        .resolve_columns(open_input(&args.input)?)
        .with_context(|| format!("Resolving header of {:?}", args.input))?;
    let mut table = Table::new(["field", "column", "header"]);
    for column in resolved {
        table.push_row(vec![column.field, column.column.to_string(), column.header]);
    }
    table.print();
    Ok(())
}

fn handle_parse(args: &cli::ParseArgs) -> Result<()> {
    let mapping = Mapping::load(&args.mapping)
        .with_context(|| format!("Loading mapping from {:?}", args.mapping))?;
    let mut builder = mapping.builder()?;
    let delimiter = match args.delimiter {
        Some(delimiter) => Some(delimiter),
        None => mapping.delimiter()?,
    };
    builder = builder.with_delimiter(io_utils::resolve_input_delimiter(&args.input, delimiter));
    if let Some(encoding) = &args.input_encoding {
        builder = builder.with_encoding(encoding.clone());
    }
    let parser = builder.build().context("Configuring parser")?;
    info!(
        "Parsing '{}' into {} field(s) using delimiter '{}'",
        args.input.display(),
        mapping.fields.len(),
        printable_delimiter(parser.delimiter())
    );

    let records = if io_utils::is_dash(&args.input) {
        parser.parse_stream(io::stdin().lock())
    } else {
        parser.parse_path(&args.input)
    }
    .with_context(|| format!("Parsing {:?}", args.input))?;
    info!("Parsed {} record(s)", records.len());

    let shown = args.limit.unwrap_or(records.len()).min(records.len());
    debug!("Printing {shown} record(s) as {:?}", args.format);
    let names = mapping.field_names();
    match args.format {
        OutputFormat::Table => {
            let mut table = Table::new(names).with_max_cell_width(MAX_CELL_WIDTH);
            for record in &records[..shown] {
                table.push_row(record.display_row());
            }
            table.print();
        }
        OutputFormat::Json => {
            let values = records[..shown]
                .iter()
                .map(|record| record.to_json(&names))
                .collect::<Vec<_>>();
            let rendered =
                serde_json::to_string_pretty(&values).context("Serializing records to JSON")?;
            println!("{rendered}");
        }
    }
    Ok(())
}

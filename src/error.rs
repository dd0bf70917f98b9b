//! Error taxonomy for building parsers, resolving headers, and converting cells.
//!
//! Each phase has its own error type so callers can tell a misconfigured
//! parser ([`BuildError`]) from an input whose header does not fit the record
//! ([`ResolutionError`]) or a single bad cell ([`ConversionError`]). All of
//! them abort the operation in progress; [`Error`] wraps them together with
//! the I/O failures of the record source.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::convert::TemporalKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("{record} has no field named '{field}' to write identifiers into")]
    MissingIdentifierField { record: String, field: String },
    #[error("identifier field '{field}' must be an integer or GUID, found {kind}")]
    UnsupportedIdentifierKind { field: String, kind: String },
    #[error(
        "{strategy} declares {provided} column(s) but {record} has {expected} mappable field(s)"
    )]
    ColumnCountMismatch {
        strategy: &'static str,
        record: String,
        expected: usize,
        provided: usize,
    },
    #[error("column strategy is already set to {existing}; cannot also use {requested}")]
    ConflictingColumnStrategies {
        existing: &'static str,
        requested: &'static str,
    },
    #[error("format for {kind} values is configured more than once")]
    DuplicateFormat { kind: TemporalKind },
    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),
    #[error("encoding {0} is not ASCII-compatible, so its cells cannot be split on a delimiter")]
    UnsupportedEncoding(&'static str),
    #[error("{0} does not declare any mappable fields")]
    EmptyFieldTable(String),
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("input does not contain a header line")]
    MissingHeader,
    #[error(
        "column index {index} declared for field '{field}' is out of range for a header of {width} column(s)"
    )]
    IndexOutOfRange {
        field: String,
        index: usize,
        width: usize,
    },
    #[error("column '{column}' declared for field '{field}' is not present in the header")]
    MissingColumn { field: String, column: String },
    #[error("no column found for field '{field}' (tried: {})", .candidates.join(", "))]
    NoMatchingColumn {
        field: String,
        candidates: Vec<String>,
    },
    #[error("{declared} column(s) declared for {fields} field(s)")]
    DeclarationMismatch { declared: usize, fields: usize },
}

/// A single cell could not be turned into its field's value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{raw}' to {target} for field '{field}'{}: {reason}", line_suffix(.line))]
pub struct ConversionError {
    pub field: String,
    pub raw: String,
    pub target: String,
    pub reason: String,
    pub line: Option<u64>,
}

impl ConversionError {
    pub fn new(
        field: impl Into<String>,
        raw: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            raw: raw.into(),
            target: target.into(),
            reason: reason.into(),
            line: None,
        }
    }

    pub fn missing_cell(field: &str, target: &str, column: usize, width: usize) -> Self {
        Self::new(
            field,
            "",
            target,
            format!("row has {width} cell(s) but column {column} is bound to this field"),
        )
    }

    /// Attaches the 1-based input line the cell came from.
    pub fn at_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }
}

fn line_suffix(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" on line {line}"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("opening input file {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("reading input")]
    Io(#[from] io::Error),
    #[error("line {line} is not valid {encoding} text")]
    Decode { line: u64, encoding: &'static str },
    #[error("entity sink rejected the parsed records")]
    Sink(#[source] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

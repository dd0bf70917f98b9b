//! Column resolution: pairing each field converter with the header column
//! that feeds it.

use std::fmt;

use log::debug;

use crate::{
    convert::FieldConverter,
    error::ResolutionError,
    naming::NamingPolicies,
};

/// How fields find their columns. Exactly one strategy applies per parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnStrategy {
    /// Derive column names from field names through the header policy chain.
    #[default]
    Policies,
    /// One zero-based column index per field, in field order.
    Indices(Vec<usize>),
    /// One header name per field, in field order.
    Names(Vec<String>),
}

impl ColumnStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnStrategy::Policies => "naming policies",
            ColumnStrategy::Indices(_) => "explicit column indices",
            ColumnStrategy::Names(_) => "explicit column names",
        }
    }

    /// Number of declared columns for the explicit strategies.
    pub fn declared_len(&self) -> Option<usize> {
        match self {
            ColumnStrategy::Policies => None,
            ColumnStrategy::Indices(indices) => Some(indices.len()),
            ColumnStrategy::Names(names) => Some(names.len()),
        }
    }
}

/// Column names of the first input line, by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx, name.as_str()))
    }
}

/// A converter paired with the column index supplying its input.
pub struct Binding<'a, T> {
    pub converter: &'a FieldConverter<T>,
    pub column: usize,
}

impl<T> Clone for Binding<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Binding<'_, T> {}

impl<T> fmt::Debug for Binding<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("field", &self.converter.name())
            .field("column", &self.column)
            .finish()
    }
}

/// Produces exactly one binding per converter, in converter order, or fails.
///
/// A built parser has already checked the declared column count; the
/// [`ResolutionError::DeclarationMismatch`] check covers direct callers that
/// pair a strategy with an arbitrary converter list.
pub fn resolve_bindings<'a, T>(
    header: &Header,
    converters: &'a [FieldConverter<T>],
    strategy: &ColumnStrategy,
    policies: &NamingPolicies,
) -> Result<Vec<Binding<'a, T>>, ResolutionError> {
    if let Some(declared) = strategy.declared_len() {
        if declared != converters.len() {
            return Err(ResolutionError::DeclarationMismatch {
                declared,
                fields: converters.len(),
            });
        }
    }

    let bindings = converters
        .iter()
        .enumerate()
        .map(|(position, converter)| {
            let column = match strategy {
                ColumnStrategy::Indices(indices) => by_index(header, converter, indices[position])?,
                ColumnStrategy::Names(names) => by_name(header, converter, &names[position])?,
                ColumnStrategy::Policies => by_policy(header, converter, policies)?,
            };
            debug!(
                "Field '{}' bound to column {} ('{}')",
                converter.name(),
                column,
                header.name(column).unwrap_or_default()
            );
            Ok(Binding { converter, column })
        })
        .collect::<Result<Vec<_>, ResolutionError>>()?;
    Ok(bindings)
}

fn by_index<T>(
    header: &Header,
    converter: &FieldConverter<T>,
    index: usize,
) -> Result<usize, ResolutionError> {
    if index < header.width() {
        Ok(index)
    } else {
        Err(ResolutionError::IndexOutOfRange {
            field: converter.name().to_string(),
            index,
            width: header.width(),
        })
    }
}

fn by_name<T>(
    header: &Header,
    converter: &FieldConverter<T>,
    name: &str,
) -> Result<usize, ResolutionError> {
    header
        .position(name)
        .ok_or_else(|| ResolutionError::MissingColumn {
            field: converter.name().to_string(),
            column: name.to_string(),
        })
}

fn by_policy<T>(
    header: &Header,
    converter: &FieldConverter<T>,
    policies: &NamingPolicies,
) -> Result<usize, ResolutionError> {
    policies
        .first_match(converter.name(), |candidate| header.position(candidate))
        .ok_or_else(|| ResolutionError::NoMatchingColumn {
            field: converter.name().to_string(),
            candidates: policies
                .candidates(converter.name())
                .map(|candidate| candidate.into_owned())
                .collect(),
        })
}

//! Parser builder and the row-extraction loop.
//!
//! [`CsvParserBuilder`] collects configuration; [`CsvParserBuilder::build`]
//! consumes it, validates it, and creates one converter per field. The
//! resulting [`CsvParser`] only parses, so reconfiguring a built parser is not
//! expressible.
//!
//! Every parse call reads the header once, resolves bindings for that header,
//! and converts every remaining line, blank ones included. Bindings and the identifier counter live
//! only for the duration of the call.

use std::{
    any::type_name,
    fmt,
    fs::File,
    io::Read,
    path::Path,
};

use csv::ByteRecord;
use encoding_rs::Encoding;
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    convert::{ConverterConfig, ConverterFactory, FieldConverter, FormatOverrides, TemporalKind},
    error::{BuildError, ConversionError, Error, ResolutionError},
    io_utils,
    naming::NamingPolicies,
    record::{FieldTable, Record},
    resolve::{Binding, ColumnStrategy, Header, resolve_bindings},
};

pub const DEFAULT_IDENTIFIER: &str = "Id";

/// Destination for parsed records, such as a persistence layer.
pub trait EntitySink<T> {
    fn accept(&mut self, entity: T) -> anyhow::Result<()>;

    /// Finalizes the batch and reports how many records the sink holds.
    fn commit(&mut self) -> anyhow::Result<usize>;
}

impl<T> EntitySink<T> for Vec<T> {
    fn accept(&mut self, entity: T) -> anyhow::Result<()> {
        self.push(entity);
        Ok(())
    }

    fn commit(&mut self) -> anyhow::Result<usize> {
        Ok(self.len())
    }
}

/// A header field and the column it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub field: String,
    pub column: usize,
    pub header: String,
}

pub struct CsvParserBuilder<T> {
    table: FieldTable<T>,
    delimiter: u8,
    encoding: Option<String>,
    identifier: Option<String>,
    formats: FormatOverrides,
    enum_policies: Option<NamingPolicies>,
    header_policies: NamingPolicies,
    strategy: Option<ColumnStrategy>,
    issues: Vec<BuildError>,
}

impl<T: Record + 'static> CsvParser<T> {
    pub fn builder() -> CsvParserBuilder<T> {
        CsvParserBuilder::with_table(T::field_table())
    }
}

impl<T: 'static> CsvParserBuilder<T> {
    pub fn with_table(table: FieldTable<T>) -> Self {
        Self {
            table,
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: None,
            identifier: None,
            formats: FormatOverrides::default(),
            enum_policies: None,
            header_policies: NamingPolicies::new(),
            strategy: None,
            issues: Vec::new(),
        }
    }

    /// Delimiter for the header and every data row.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Input encoding label, e.g. `windows-1252`. Defaults to UTF-8.
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Writes row ordinals (integer) or fresh GUIDs into the `Id` field.
    pub fn write_id(self) -> Self {
        self.write_id_to(DEFAULT_IDENTIFIER)
    }

    pub fn write_id_to(mut self, field: impl Into<String>) -> Self {
        self.identifier = Some(field.into());
        self
    }

    pub fn with_format(mut self, kind: TemporalKind, pattern: impl Into<String>) -> Self {
        let slot = self.formats.slot_mut(kind);
        if slot.is_some() {
            self.issues.push(BuildError::DuplicateFormat { kind });
        } else {
            *slot = Some(pattern.into());
        }
        self
    }

    /// Configures the chain used to match cell text against enum members.
    /// The chain handed to `configure` starts as exact matching only.
    pub fn with_enum_policies<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(NamingPolicies) -> NamingPolicies,
    {
        let chain = self.enum_policies.take().unwrap_or_default();
        self.enum_policies = Some(configure(chain));
        self
    }

    /// Configures the chain used to derive column names from field names.
    pub fn with_header_policies<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(NamingPolicies) -> NamingPolicies,
    {
        let chain = std::mem::take(&mut self.header_policies);
        self.header_policies = configure(chain);
        self
    }

    pub fn with_column_indices(self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.with_column_strategy(ColumnStrategy::Indices(indices.into_iter().collect()))
    }

    pub fn with_column_names<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_column_strategy(ColumnStrategy::Names(
            names.into_iter().map(Into::into).collect(),
        ))
    }

    /// Selects the column strategy. Selecting a second one is a build error.
    pub fn with_column_strategy(mut self, strategy: ColumnStrategy) -> Self {
        match &self.strategy {
            Some(existing) => self.issues.push(BuildError::ConflictingColumnStrategies {
                existing: existing.label(),
                requested: strategy.label(),
            }),
            None => self.strategy = Some(strategy),
        }
        self
    }

    pub fn build(self) -> Result<CsvParser<T>, BuildError> {
        if let Some(issue) = self.issues.into_iter().next() {
            return Err(issue);
        }
        let record = type_name::<T>().to_string();
        if self.table.is_empty() {
            return Err(BuildError::EmptyFieldTable(record));
        }
        if let Some(duplicate) = self
            .table
            .fields()
            .iter()
            .map(|field| field.name())
            .duplicates()
            .next()
        {
            return Err(BuildError::DuplicateField(duplicate.to_string()));
        }
        let encoding = io_utils::resolve_encoding(self.encoding.as_deref())?;

        let factory = ConverterFactory::new(ConverterConfig {
            formats: self.formats,
            identifier: self.identifier.clone(),
            enum_policies: self.enum_policies,
        });

        let mut identifier = None;
        let mut converters = Vec::with_capacity(self.table.len());
        for field in self.table.fields() {
            if self.identifier.as_deref() == Some(field.name()) {
                if !field.kind().accepts_identifier() {
                    return Err(BuildError::UnsupportedIdentifierKind {
                        field: field.name().to_string(),
                        kind: field.kind().to_string(),
                    });
                }
                identifier = Some(factory.create(field));
            } else {
                converters.push(factory.create(field));
            }
        }
        if let (Some(field), None) = (&self.identifier, &identifier) {
            return Err(BuildError::MissingIdentifierField {
                record,
                field: field.clone(),
            });
        }

        let strategy = self.strategy.unwrap_or_default();
        if let Some(provided) = strategy.declared_len() {
            if provided != converters.len() {
                return Err(BuildError::ColumnCountMismatch {
                    strategy: strategy.label(),
                    record,
                    expected: converters.len(),
                    provided,
                });
            }
        }

        debug!(
            "Built parser for {} with {} converter(s), {} and delimiter '{}'{}",
            record,
            converters.len(),
            strategy.label(),
            io_utils::printable_delimiter(self.delimiter),
            identifier
                .as_ref()
                .map(|id| format!(", writing identifiers into '{}'", id.name()))
                .unwrap_or_default()
        );

        Ok(CsvParser {
            table: self.table,
            converters,
            identifier,
            strategy,
            header_policies: self.header_policies,
            delimiter: self.delimiter,
            encoding,
        })
    }
}

/// A configured parser. Immutable; every parse call is independent.
pub struct CsvParser<T> {
    table: FieldTable<T>,
    converters: Vec<FieldConverter<T>>,
    identifier: Option<FieldConverter<T>>,
    strategy: ColumnStrategy,
    header_policies: NamingPolicies,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl<T> fmt::Debug for CsvParser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvParser")
            .field("converters", &self.converters)
            .field("identifier", &self.identifier)
            .field("strategy", &self.strategy)
            .field("header_policies", &self.header_policies)
            .field("delimiter", &(self.delimiter as char))
            .field("encoding", &self.encoding.name())
            .finish_non_exhaustive()
    }
}

impl<T> CsvParser<T> {
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn strategy(&self) -> &ColumnStrategy {
        &self.strategy
    }

    /// Converters for the columns, in field order, without the written identifier.
    pub fn converters(&self) -> &[FieldConverter<T>] {
        &self.converters
    }

    pub fn identifier(&self) -> Option<&FieldConverter<T>> {
        self.identifier.as_ref()
    }

    /// Parses every row from a reader the caller keeps ownership of.
    pub fn parse<R: Read>(&self, reader: &mut R) -> Result<Vec<T>, Error> {
        let mut records = Vec::new();
        self.drive(reader, |record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    /// Parses a file, closing it before returning on every path.
    pub fn parse_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<T>, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Parsing {path:?}");
        self.parse_stream(file)
    }

    /// Parses a stream the parser takes ownership of; it is dropped once
    /// parsing completes or fails.
    pub fn parse_stream<R: Read>(&self, mut stream: R) -> Result<Vec<T>, Error> {
        self.parse(&mut stream)
    }

    /// Hands every parsed record to `sink`, then commits it and returns the
    /// count the sink reports. Nothing is committed if any row fails.
    pub fn parse_into_sink<R, S>(&self, stream: R, sink: &mut S) -> Result<usize, Error>
    where
        R: Read,
        S: EntitySink<T>,
    {
        let rows = self.drive(stream, |record| sink.accept(record).map_err(Error::Sink))?;
        let accepted = sink.commit().map_err(Error::Sink)?;
        debug!("Sink accepted {accepted} of {rows} parsed record(s)");
        Ok(accepted)
    }

    /// Resolves the header of `reader` without converting any rows.
    pub fn resolve_columns<R: Read>(&self, reader: R) -> Result<Vec<ResolvedColumn>, Error> {
        let mut records = io_utils::RecordReader::new(reader, self.delimiter);
        let header = self.read_header(&mut records)?;
        let bindings = self.bind(&header)?;
        Ok(bindings
            .iter()
            .map(|binding| ResolvedColumn {
                field: binding.converter.name().to_string(),
                column: binding.column,
                header: header.name(binding.column).unwrap_or_default().to_string(),
            })
            .collect())
    }

    fn drive<R, F>(&self, reader: R, mut emit: F) -> Result<usize, Error>
    where
        R: Read,
        F: FnMut(T) -> Result<(), Error>,
    {
        let mut records = io_utils::RecordReader::new(reader, self.delimiter);
        let header = self.read_header(&mut records)?;
        let bindings = self.bind(&header)?;

        let mut raw = ByteRecord::new();
        let mut ordinal = 0usize;
        while records.read_record(&mut raw)? {
            let line = records.line();
            let cells = io_utils::decode_record(&raw, self.encoding)?;
            let record = self
                .convert_row(&bindings, &cells, ordinal)
                .map_err(|err| err.at_line(line))?;
            trace!("Converted line {line} into record #{ordinal}");
            emit(record)?;
            ordinal += 1;
        }
        debug!("Parsed {ordinal} record(s)");
        Ok(ordinal)
    }

    fn read_header<R: Read>(
        &self,
        records: &mut io_utils::RecordReader<R>,
    ) -> Result<Header, Error> {
        let mut raw = ByteRecord::new();
        if !records.read_record(&mut raw)? {
            return Err(ResolutionError::MissingHeader.into());
        }
        Ok(Header::new(io_utils::decode_record(&raw, self.encoding)?))
    }

    fn bind<'a>(&'a self, header: &Header) -> Result<Vec<Binding<'a, T>>, ResolutionError> {
        debug!(
            "Resolving {} field(s) against a header of {} column(s)",
            self.converters.len(),
            header.width()
        );
        resolve_bindings(header, &self.converters, &self.strategy, &self.header_policies)
    }

    fn convert_row(
        &self,
        bindings: &[Binding<'_, T>],
        cells: &[String],
        ordinal: usize,
    ) -> Result<T, ConversionError> {
        let mut record = self.table.instantiate();
        for binding in bindings {
            let converter = binding.converter;
            let cell = cells.get(binding.column).ok_or_else(|| {
                ConversionError::missing_cell(
                    converter.name(),
                    &converter.field().kind().to_string(),
                    binding.column,
                    cells.len(),
                )
            })?;
            converter.apply(&mut record, cell)?;
        }
        if let Some(identifier) = &self.identifier {
            identifier.apply(&mut record, &ordinal.to_string())?;
        }
        Ok(record)
    }
}

//! YAML mapping files describing records at runtime.
//!
//! A mapping lists the fields of a [`DynamicRecord`] together with the parser
//! configuration that would otherwise be written against the builder:
//!
//! ```yaml
//! delimiter: ";"
//! write_id: Id
//! fields:
//!   - name: Id
//!     type: integer
//!   - name: Coffee
//!     type: enum
//!     members: [Espresso, AmericanoWithMilk]
//! header_policies: [exact, pascal-to-snake]
//! enum_policies: [suppress-capitalize]
//! formats:
//!   date: "%d.%m.%Y"
//! ```
//!
//! Listed policy chains replace the default exact-only chain.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    convert::TemporalKind,
    data::Value,
    io_utils,
    naming::{NamingPolicies, NamingPolicy},
    parser::{CsvParserBuilder, DEFAULT_IDENTIFIER},
    record::{FieldDescriptor, FieldKind, FieldTable},
    resolve::ColumnStrategy,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mapping {
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_id: Option<IdentifierSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_policies: Vec<PolicySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_policies: Vec<PolicySpec>,
    #[serde(default)]
    pub formats: FormatSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<ColumnsSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub datatype: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

/// `write_id: true` targets the `Id` field; a string names another field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IdentifierSpec {
    Enabled(bool),
    Field(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PolicySpec {
    Named(String),
    Replace { replace: ReplaceSpec },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplaceSpec {
    pub pattern: String,
    #[serde(default)]
    pub with: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "datetime")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ColumnsSpec {
    Indices(Vec<usize>),
    Names(Vec<String>),
}

impl PolicySpec {
    pub fn to_policy(&self) -> Result<NamingPolicy> {
        match self {
            PolicySpec::Named(name) => name.parse(),
            PolicySpec::Replace { replace } => NamingPolicy::replace(&replace.pattern, &replace.with),
        }
    }
}

impl FieldSpec {
    pub fn kind(&self) -> Result<FieldKind> {
        if self.datatype.trim().eq_ignore_ascii_case("enum") {
            ensure!(
                !self.members.is_empty(),
                "Enumeration field '{}' must list its members",
                self.name
            );
            return Ok(FieldKind::Enumeration(self.members.clone()));
        }
        ensure!(
            self.members.is_empty(),
            "Field '{}' lists members but is not an enumeration",
            self.name
        );
        self.datatype
            .parse()
            .with_context(|| format!("Field '{}'", self.name))
    }
}

fn policy_chain(specs: &[PolicySpec]) -> Result<Option<NamingPolicies>> {
    let mut iter = specs.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut chain = NamingPolicies::new().with_policy(first.to_policy()?);
    for spec in iter {
        chain = chain.add_policy(spec.to_policy()?);
    }
    Ok(Some(chain))
}

impl Mapping {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening mapping file {path:?}"))?;
        let mapping: Mapping = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing mapping YAML {path:?}"))?;
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mapping: Mapping = serde_yaml::from_str(yaml).context("Parsing mapping YAML")?;
        mapping.validate()?;
        Ok(mapping)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.fields.is_empty(), "Mapping does not declare any fields");
        for field in &self.fields {
            ensure!(!field.name.trim().is_empty(), "Field names cannot be empty");
            field.kind()?;
        }
        Ok(())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    pub fn identifier(&self) -> Option<&str> {
        match self.write_id.as_ref()? {
            IdentifierSpec::Enabled(true) => Some(DEFAULT_IDENTIFIER),
            IdentifierSpec::Enabled(false) => None,
            IdentifierSpec::Field(name) => Some(name.as_str()),
        }
    }

    pub fn delimiter(&self) -> Result<Option<u8>> {
        self.delimiter
            .as_deref()
            .map(|value| io_utils::parse_delimiter(value).map_err(|err| anyhow!(err)))
            .transpose()
            .context("Mapping delimiter")
    }

    /// One slot per declared field, filled by position.
    pub fn field_table(&self) -> Result<FieldTable<DynamicRecord>> {
        let width = self.fields.len();
        let mut table = FieldTable::with_constructor(move || DynamicRecord::with_width(width));
        for (slot, field) in self.fields.iter().enumerate() {
            let kind = field.kind()?;
            table = table.descriptor(FieldDescriptor::new(
                field.name.clone(),
                kind,
                move |record: &mut DynamicRecord, value| record.set(slot, value),
            ));
        }
        Ok(table)
    }

    /// Translates the mapping into builder calls. Configuration conflicts still
    /// surface from [`CsvParserBuilder::build`].
    pub fn builder(&self) -> Result<CsvParserBuilder<DynamicRecord>> {
        let mut builder = CsvParserBuilder::with_table(self.field_table()?);
        if let Some(delimiter) = self.delimiter()? {
            builder = builder.with_delimiter(delimiter);
        }
        if let Some(encoding) = &self.encoding {
            builder = builder.with_encoding(encoding.clone());
        }
        if let Some(field) = self.identifier() {
            builder = builder.write_id_to(field);
        }
        let formats = [
            (TemporalKind::Date, &self.formats.date),
            (TemporalKind::DateTime, &self.formats.date_time),
            (TemporalKind::Time, &self.formats.time),
            (TemporalKind::Duration, &self.formats.duration),
        ];
        for (kind, pattern) in formats {
            if let Some(pattern) = pattern {
                builder = builder.with_format(kind, pattern.clone());
            }
        }
        if let Some(chain) = policy_chain(&self.header_policies).context("Header policies")? {
            builder = builder.with_header_policies(|_| chain);
        }
        if let Some(chain) = policy_chain(&self.enum_policies).context("Enum policies")? {
            builder = builder.with_enum_policies(|_| chain);
        }
        builder = match &self.columns {
            Some(ColumnsSpec::Indices(indices)) => {
                builder.with_column_strategy(ColumnStrategy::Indices(indices.clone()))
            }
            Some(ColumnsSpec::Names(names)) => {
                builder.with_column_strategy(ColumnStrategy::Names(names.clone()))
            }
            None => builder,
        };
        Ok(builder)
    }
}

/// A record whose fields are known only at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    values: Vec<Option<Value>>,
}

impl DynamicRecord {
    pub fn with_width(width: usize) -> Self {
        Self {
            values: vec![None; width],
        }
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn get(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot).and_then(Option::as_ref)
    }

    fn set(&mut self, slot: usize, value: Value) -> Result<(), String> {
        let width = self.values.len();
        let target = self
            .values
            .get_mut(slot)
            .ok_or_else(|| format!("slot {slot} is outside a record of width {width}"))?;
        *target = Some(value);
        Ok(())
    }

    /// Display strings per slot; unset slots render empty.
    pub fn display_row(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|value| value.as_ref().map(Value::as_display).unwrap_or_default())
            .collect()
    }

    pub fn to_json(&self, names: &[String]) -> JsonValue {
        let object = names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.clone(), value.as_ref().map_or(JsonValue::Null, json_value)))
            .collect::<Map<_, _>>();
        JsonValue::Object(object)
    }
}

fn json_value(value: &Value) -> JsonValue {
    match value {
        Value::Integer(v) => i64::try_from(*v)
            .map(JsonValue::from)
            .unwrap_or_else(|_| JsonValue::String(v.to_string())),
        Value::Float(v) => Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        Value::Boolean(v) => JsonValue::Bool(*v),
        other => JsonValue::String(other.as_display()),
    }
}

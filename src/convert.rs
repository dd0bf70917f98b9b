//! Converter factory and the per-field converters it produces.
//!
//! The [`ConverterFactory`] owns the typed [`ConverterConfig`] accumulated while
//! a parser is being configured and turns every [`FieldDescriptor`] into a
//! [`FieldConverter`]. Dispatch follows a fixed precedence: date, date-time,
//! time, duration, GUID, enumeration, then the generic primitive converter.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::{
    data::{
        Value, parse_duration, parse_duration_with_format, parse_guid, parse_naive_date,
        parse_naive_datetime, parse_naive_time, parse_typed_value,
    },
    error::ConversionError,
    naming::NamingPolicies,
    record::{FieldDescriptor, FieldKind},
};

/// Field kinds that accept a custom format pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Date,
    DateTime,
    Time,
    Duration,
}

impl TemporalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TemporalKind::Date => "date",
            TemporalKind::DateTime => "datetime",
            TemporalKind::Time => "time",
            TemporalKind::Duration => "duration",
        }
    }
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemporalKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" | "dateonly" => Ok(TemporalKind::Date),
            "datetime" | "date_time" => Ok(TemporalKind::DateTime),
            "time" | "timeonly" => Ok(TemporalKind::Time),
            "duration" | "timespan" => Ok(TemporalKind::Duration),
            other => Err(anyhow!("'{other}' does not accept a format pattern")),
        }
    }
}

/// Strict `chrono` format patterns, one optional slot per temporal kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOverrides {
    pub date: Option<String>,
    pub date_time: Option<String>,
    pub time: Option<String>,
    pub duration: Option<String>,
}

impl FormatOverrides {
    pub fn get(&self, kind: TemporalKind) -> Option<&str> {
        match kind {
            TemporalKind::Date => self.date.as_deref(),
            TemporalKind::DateTime => self.date_time.as_deref(),
            TemporalKind::Time => self.time.as_deref(),
            TemporalKind::Duration => self.duration.as_deref(),
        }
    }

    pub fn slot_mut(&mut self, kind: TemporalKind) -> &mut Option<String> {
        match kind {
            TemporalKind::Date => &mut self.date,
            TemporalKind::DateTime => &mut self.date_time,
            TemporalKind::Time => &mut self.time,
            TemporalKind::Duration => &mut self.duration,
        }
    }

    fn owned(&self, kind: TemporalKind) -> Option<String> {
        self.get(kind).map(str::to_string)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConverterConfig {
    pub formats: FormatOverrides,
    /// Name of the field identifiers are written into, when enabled.
    pub identifier: Option<String>,
    pub enum_policies: Option<NamingPolicies>,
}

#[derive(Debug, Clone, Default)]
pub struct ConverterFactory {
    config: ConverterConfig,
}

impl ConverterFactory {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn create<T>(&self, field: &FieldDescriptor<T>) -> FieldConverter<T> {
        let formats = &self.config.formats;
        let conversion = match field.kind() {
            FieldKind::Date => Conversion::Date {
                format: formats.owned(TemporalKind::Date),
            },
            FieldKind::DateTime => Conversion::DateTime {
                format: formats.owned(TemporalKind::DateTime),
            },
            FieldKind::Time => Conversion::Time {
                format: formats.owned(TemporalKind::Time),
            },
            FieldKind::Duration => Conversion::Duration {
                format: formats.owned(TemporalKind::Duration),
            },
            FieldKind::Guid => Conversion::Guid {
                generate: self.config.identifier.as_deref() == Some(field.name()),
            },
            FieldKind::Enumeration(members) => Conversion::Enumeration {
                members: members.clone(),
                policies: self.config.enum_policies.clone().unwrap_or_default(),
            },
            _ => Conversion::Generic,
        };
        FieldConverter {
            field: field.clone(),
            conversion,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Conversion {
    Generic,
    Date { format: Option<String> },
    DateTime { format: Option<String> },
    Time { format: Option<String> },
    Duration { format: Option<String> },
    Guid { generate: bool },
    Enumeration {
        members: Vec<String>,
        policies: NamingPolicies,
    },
}

/// Converts one cell's text and writes the result into its record field.
pub struct FieldConverter<T> {
    field: FieldDescriptor<T>,
    conversion: Conversion,
}

impl<T> fmt::Debug for FieldConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConverter")
            .field("field", &self.field)
            .field("conversion", &self.conversion)
            .finish()
    }
}

impl<T> FieldConverter<T> {
    pub fn field(&self) -> &FieldDescriptor<T> {
        &self.field
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub fn is_generator(&self) -> bool {
        matches!(self.conversion, Conversion::Guid { generate: true })
    }

    pub fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        match &self.conversion {
            Conversion::Generic => parse_typed_value(raw, self.field.kind())
                .map_err(|err| self.error(raw, err.to_string())),
            Conversion::Date { format } => match format {
                Some(fmt) => NaiveDate::parse_from_str(raw, fmt)
                    .map(Value::Date)
                    .map_err(|err| self.format_error(raw, fmt, err)),
                None => parse_naive_date(raw.trim())
                    .map(Value::Date)
                    .map_err(|err| self.error(raw, err.to_string())),
            },
            Conversion::DateTime { format } => match format {
                Some(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
                    .map(Value::DateTime)
                    .map_err(|err| self.format_error(raw, fmt, err)),
                None => parse_naive_datetime(raw.trim())
                    .map(Value::DateTime)
                    .map_err(|err| self.error(raw, err.to_string())),
            },
            Conversion::Time { format } => match format {
                Some(fmt) => NaiveTime::parse_from_str(raw, fmt)
                    .map(Value::Time)
                    .map_err(|err| self.format_error(raw, fmt, err)),
                None => parse_naive_time(raw.trim())
                    .map(Value::Time)
                    .map_err(|err| self.error(raw, err.to_string())),
            },
            Conversion::Duration { format } => match format {
                Some(fmt) => parse_duration_with_format(raw, fmt)
                    .map(Value::Duration)
                    .map_err(|err| self.format_error(raw, fmt, err.root_cause())),
                None => parse_duration(raw.trim())
                    .map(Value::Duration)
                    .map_err(|err| self.error(raw, err.to_string())),
            },
            Conversion::Guid { generate: true } => Ok(Value::Guid(Uuid::new_v4())),
            Conversion::Guid { generate: false } => parse_guid(raw)
                .map(Value::Guid)
                .map_err(|err| self.error(raw, err.to_string())),
            Conversion::Enumeration { members, policies } => policies
                .first_match(raw, |candidate| {
                    members.iter().find(|member| member.as_str() == candidate)
                })
                .map(|member| Value::Enum(member.clone()))
                .ok_or_else(|| {
                    self.error(
                        raw,
                        format!(
                            "no member of [{}] matches under {} naming polic{}",
                            members.join(", "),
                            policies.len(),
                            if policies.len() == 1 { "y" } else { "ies" }
                        ),
                    )
                }),
        }
    }

    pub fn apply(&self, record: &mut T, raw: &str) -> Result<(), ConversionError> {
        let value = self.convert(raw)?;
        self.field
            .assign(record, value)
            .map_err(|reason| self.error(raw, reason))
    }

    fn error(&self, raw: &str, reason: impl Into<String>) -> ConversionError {
        ConversionError::new(
            self.field.name(),
            raw,
            self.field.kind().to_string(),
            reason,
        )
    }

    fn format_error(&self, raw: &str, format: &str, err: impl fmt::Display) -> ConversionError {
        self.error(raw, format!("does not match format '{format}': {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NamingPolicy;
    use chrono::TimeDelta;

    #[derive(Debug, Default)]
    struct Slot {
        value: Option<Value>,
    }

    fn descriptor(name: &str, kind: FieldKind) -> FieldDescriptor<Slot> {
        FieldDescriptor::new(name, kind, |slot: &mut Slot, value| {
            slot.value = Some(value);
            Ok(())
        })
    }

    fn coffee() -> FieldKind {
        FieldKind::Enumeration(vec![
            "Espresso".to_string(),
            "AmericanoWithMilk".to_string(),
        ])
    }

    #[test]
    fn factory_dispatches_by_kind() {
        let factory = ConverterFactory::default();
        let cases = [
            (FieldKind::Date, "Date"),
            (FieldKind::DateTime, "DateTime"),
            (FieldKind::Time, "Time"),
            (FieldKind::Duration, "Duration"),
            (FieldKind::Guid, "Guid"),
            (coffee(), "Enumeration"),
            (FieldKind::Integer, "Generic"),
            (FieldKind::Text, "Generic"),
        ];
        for (kind, expected) in cases {
            let converter = factory.create(&descriptor("Field", kind));
            let actual = format!("{:?}", converter.conversion());
            assert_eq!(actual.split_whitespace().next(), Some(expected), "{actual}");
        }
    }

    #[test]
    fn guid_generation_requires_identifier_name_and_flag() {
        let writing = ConverterFactory::new(ConverterConfig {
            identifier: Some("Id".to_string()),
            ..ConverterConfig::default()
        });
        assert!(writing.create(&descriptor("Id", FieldKind::Guid)).is_generator());
        assert!(!writing.create(&descriptor("OwnerId", FieldKind::Guid)).is_generator());

        let reading = ConverterFactory::default();
        assert!(!reading.create(&descriptor("Id", FieldKind::Guid)).is_generator());
    }

    #[test]
    fn generated_guids_ignore_cell_text() {
        let factory = ConverterFactory::new(ConverterConfig {
            identifier: Some("Id".to_string()),
            ..ConverterConfig::default()
        });
        let converter = factory.create(&descriptor("Id", FieldKind::Guid));
        for raw in ["", "not-a-guid", "550e8400-e29b-41d4-a716-446655440000"] {
            match converter.convert(raw).unwrap() {
                Value::Guid(id) => assert!(!id.is_nil()),
                other => panic!("expected a GUID, got {other:?}"),
            }
        }
    }

    #[test]
    fn parsed_guids_are_deterministic() {
        let converter = ConverterFactory::default().create(&descriptor("Ref", FieldKind::Guid));
        let raw = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(converter.convert(raw).unwrap(), converter.convert(raw).unwrap());
        assert!(converter.convert("nope").is_err());
    }

    #[test]
    fn format_overrides_are_strict() {
        let mut formats = FormatOverrides::default();
        *formats.slot_mut(TemporalKind::Date) = Some("%d.%m.%Y".to_string());
        let factory = ConverterFactory::new(ConverterConfig {
            formats,
            ..ConverterConfig::default()
        });
        let converter = factory.create(&descriptor("Born", FieldKind::Date));
        assert_eq!(
            converter.convert("31.12.2023").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
        );
        let err = converter.convert("2023-12-31").unwrap_err();
        assert!(err.reason.contains("%d.%m.%Y"));
        assert_eq!(err.target, "date");
    }

    #[test]
    fn duration_format_measures_from_midnight() {
        let mut formats = FormatOverrides::default();
        *formats.slot_mut(TemporalKind::Duration) = Some("%H:%M:%S".to_string());
        let factory = ConverterFactory::new(ConverterConfig {
            formats,
            ..ConverterConfig::default()
        });
        let converter = factory.create(&descriptor("Elapsed", FieldKind::Duration));
        assert_eq!(
            converter.convert("15:30:45").unwrap(),
            Value::Duration(TimeDelta::new(55_845, 0).unwrap())
        );
        let err = converter.convert("15h30").unwrap_err();
        assert!(err.reason.starts_with("does not match format '%H:%M:%S': "));
        assert_eq!(err.target, "duration");
    }

    #[test]
    fn enum_defaults_to_exact_matching() {
        let converter = ConverterFactory::default().create(&descriptor("Coffee", coffee()));
        assert_eq!(
            converter.convert("Espresso").unwrap(),
            Value::Enum("Espresso".to_string())
        );
        let err = converter.convert("espresso").unwrap_err();
        assert_eq!(err.field, "Coffee");
        assert_eq!(err.raw, "espresso");
    }

    #[test]
    fn enum_tries_policies_in_order() {
        let factory = ConverterFactory::new(ConverterConfig {
            enum_policies: Some(
                NamingPolicies::new()
                    .add_policy(NamingPolicy::SuppressAndCapitalize),
            ),
            ..ConverterConfig::default()
        });
        let converter = factory.create(&descriptor("Coffee", coffee()));
        assert_eq!(
            converter.convert("americano with milk").unwrap(),
            Value::Enum("AmericanoWithMilk".to_string())
        );
        assert!(converter.convert("flat white").is_err());
    }

    #[test]
    fn apply_writes_into_the_record() {
        let converter = ConverterFactory::default().create(&descriptor("Age", FieldKind::Integer));
        let mut slot = Slot::default();
        converter.apply(&mut slot, "25").unwrap();
        assert_eq!(slot.value, Some(Value::Integer(25)));
        let err = converter.apply(&mut slot, "twenty").unwrap_err();
        assert_eq!(err.target, "integer");
    }
}

//! Static field tables describing how a record type receives converted cells.
//!
//! A record type declares its mappable fields once, in declaration order,
//! through a [`FieldTable`]. Each [`FieldDescriptor`] carries the field name,
//! its semantic [`FieldKind`] and a setter closure that narrows a converted
//! [`Value`] into the concrete Rust field.
//!
//! ```
//! use csv_mapper::record::{FieldTable, Record};
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     name: String,
//!     age: u8,
//! }
//!
//! impl Record for Person {
//!     fn field_table() -> FieldTable<Self> {
//!         FieldTable::new()
//!             .field("Name", |person: &mut Person, value: String| person.name = value)
//!             .field("Age", |person: &mut Person, value: u8| person.age = value)
//!     }
//! }
//!
//! assert_eq!(Person::field_table().len(), 2);
//! ```

use std::{fmt, str::FromStr, sync::Arc};

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::data::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Duration,
    Guid,
    Enumeration(Vec<String>),
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::Time => "time",
            FieldKind::Duration => "duration",
            FieldKind::Guid => "guid",
            FieldKind::Enumeration(_) => "enum",
        }
    }

    /// Kinds an identifier can be written into: row ordinals or generated GUIDs.
    pub fn accepts_identifier(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Guid)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Enumeration(members) => write!(f, "enum({})", members.join("|")),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for FieldKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "text" => Ok(FieldKind::Text),
            "integer" | "int" | "long" => Ok(FieldKind::Integer),
            "float" | "double" => Ok(FieldKind::Float),
            "decimal" => Ok(FieldKind::Decimal),
            "boolean" | "bool" => Ok(FieldKind::Boolean),
            "date" | "dateonly" => Ok(FieldKind::Date),
            "datetime" => Ok(FieldKind::DateTime),
            "time" | "timeonly" => Ok(FieldKind::Time),
            "duration" | "timespan" => Ok(FieldKind::Duration),
            "guid" | "uuid" => Ok(FieldKind::Guid),
            "enum" => Err(anyhow!("Enumeration fields must list their members")),
            _ => Err(anyhow!("Unknown field type '{value}'")),
        }
    }
}

/// Rust types a converted [`Value`] can be narrowed into.
pub trait FieldValue: Sized {
    fn kind() -> FieldKind;
    fn from_value(value: Value) -> Result<Self, String>;
}

/// Enumerations matched by member name.
pub trait CsvEnum: Sized {
    const MEMBERS: &'static [&'static str];

    fn from_member(member: &str) -> Option<Self>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected a {expected} value, found {}", value.type_name())
}

macro_rules! integer_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::Integer
                }

                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Integer(v) => <$ty>::try_from(v).map_err(|_| {
                            format!("{v} is out of range for {}", stringify!($ty))
                        }),
                        other => Err(mismatch("integer", &other)),
                    }
                }
            }
        )*
    };
}

integer_field_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

macro_rules! direct_field_value {
    ($($ty:ty => $kind:ident, $variant:ident);* $(;)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }

                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(FieldKind::$kind.as_str(), &other)),
                    }
                }
            }
        )*
    };
}

direct_field_value! {
    String => Text, Text;
    f64 => Float, Float;
    Decimal => Decimal, Decimal;
    bool => Boolean, Boolean;
    NaiveDate => Date, Date;
    NaiveDateTime => DateTime, DateTime;
    NaiveTime => Time, Time;
    TimeDelta => Duration, Duration;
    Uuid => Guid, Guid;
}

impl FieldValue for f32 {
    fn kind() -> FieldKind {
        FieldKind::Float
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => {
                let narrowed = v as f32;
                if v.is_finite() && !narrowed.is_finite() {
                    Err(format!("{v} is out of range for f32"))
                } else {
                    Ok(narrowed)
                }
            }
            other => Err(mismatch("float", &other)),
        }
    }
}

pub type Setter<T> = Arc<dyn Fn(&mut T, Value) -> Result<(), String> + Send + Sync>;

/// One mappable field of a record type.
pub struct FieldDescriptor<T> {
    name: String,
    kind: FieldKind,
    setter: Setter<T>,
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
            setter: Arc::clone(&self.setter),
        }
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> FieldDescriptor<T> {
    pub fn new<F>(name: impl Into<String>, kind: FieldKind, setter: F) -> Self
    where
        F: Fn(&mut T, Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            setter: Arc::new(setter),
        }
    }

    pub fn typed<V, F>(name: impl Into<String>, assign: F) -> Self
    where
        V: FieldValue + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::new(name, V::kind(), move |record, value| {
            assign(record, V::from_value(value)?);
            Ok(())
        })
    }

    pub fn enumeration<E, F>(name: impl Into<String>, assign: F) -> Self
    where
        E: CsvEnum + 'static,
        F: Fn(&mut T, E) + Send + Sync + 'static,
    {
        let members = E::MEMBERS.iter().map(|m| m.to_string()).collect();
        Self::new(name, FieldKind::Enumeration(members), move |record, value| {
            let member = match value {
                Value::Enum(member) => member,
                other => return Err(mismatch("enum", &other)),
            };
            let parsed = E::from_member(&member)
                .ok_or_else(|| format!("'{member}' is not a declared member"))?;
            assign(record, parsed);
            Ok(())
        })
    }
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn assign(&self, record: &mut T, value: Value) -> Result<(), String> {
        (self.setter)(record, value)
    }
}

/// Ordered field descriptors plus the constructor for fresh records.
pub struct FieldTable<T> {
    fields: Vec<FieldDescriptor<T>>,
    constructor: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> fmt::Debug for FieldTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTable")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl<T: Default + 'static> FieldTable<T> {
    pub fn new() -> Self {
        Self::with_constructor(T::default)
    }
}

impl<T: Default + 'static> Default for FieldTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> FieldTable<T> {
    pub fn with_constructor<F>(constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            fields: Vec::new(),
            constructor: Arc::new(constructor),
        }
    }

    pub fn field<V, F>(self, name: impl Into<String>, assign: F) -> Self
    where
        V: FieldValue + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.descriptor(FieldDescriptor::typed(name, assign))
    }

    pub fn enumeration<E, F>(self, name: impl Into<String>, assign: F) -> Self
    where
        E: CsvEnum + 'static,
        F: Fn(&mut T, E) + Send + Sync + 'static,
    {
        self.descriptor(FieldDescriptor::enumeration(name, assign))
    }

    pub fn descriptor(mut self, descriptor: FieldDescriptor<T>) -> Self {
        self.fields.push(descriptor);
        self
    }
}

impl<T> FieldTable<T> {
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn instantiate(&self) -> T {
        (self.constructor)()
    }
}

/// A type with a statically declared field table.
pub trait Record: Sized {
    fn field_table() -> FieldTable<Self>;
}

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use csv_mapper::{CsvEnum, FieldTable, Record};
use tempfile::{TempDir, tempdir};
use uuid::Uuid;

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: u8,
    pub height: u16,
}

impl Record for Person {
    fn field_table() -> FieldTable<Self> {
        FieldTable::new()
            .field("Name", |p: &mut Person, v: String| p.name = v)
            .field("Age", |p: &mut Person, v: u8| p.age = v)
            .field("Height", |p: &mut Person, v: u16| p.height = v)
    }
}

/// Name plus an integer identifier written by the parser.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Visitor {
    pub id: i32,
    pub name: String,
}

impl Record for Visitor {
    fn field_table() -> FieldTable<Self> {
        FieldTable::new()
            .field("Id", |v: &mut Visitor, id: i32| v.id = id)
            .field("Name", |v: &mut Visitor, name: String| v.name = name)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Coffee {
    #[default]
    Espresso,
    AmericanoWithMilk,
    Cappuccino,
}

impl CsvEnum for Coffee {
    const MEMBERS: &'static [&'static str] = &["Espresso", "AmericanoWithMilk", "Cappuccino"];

    fn from_member(member: &str) -> Option<Self> {
        match member {
            "Espresso" => Some(Coffee::Espresso),
            "AmericanoWithMilk" => Some(Coffee::AmericanoWithMilk),
            "Cappuccino" => Some(Coffee::Cappuccino),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub coffee: Coffee,
    pub customer: String,
}

impl Record for Order {
    fn field_table() -> FieldTable<Self> {
        FieldTable::new()
            .field("Id", |o: &mut Order, v: Uuid| o.id = v)
            .enumeration("Coffee", |o: &mut Order, v: Coffee| o.coffee = v)
            .field("Customer", |o: &mut Order, v: String| o.customer = v)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Schedule {
    pub date_only: NaiveDate,
    pub time_span: TimeDelta,
    pub date_time: NaiveDateTime,
}

impl Record for Schedule {
    fn field_table() -> FieldTable<Self> {
        FieldTable::new()
            .field("DateOnly", |s: &mut Schedule, v: NaiveDate| s.date_only = v)
            .field("TimeSpan", |s: &mut Schedule, v: TimeDelta| s.time_span = v)
            .field("DateTime", |s: &mut Schedule, v: NaiveDateTime| s.date_time = v)
    }
}

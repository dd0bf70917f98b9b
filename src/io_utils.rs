//! Record source construction, delimiter resolution, and input decoding.
//!
//! Input is split by [`RecordReader`] in this crate's plain format: one
//! record per line, a single-byte delimiter, and no quoting. Rows may vary in
//! width, so a short row surfaces as a conversion error instead of a reader
//! error. Cells are split on raw bytes before decoding, which limits input
//! encodings to ASCII-compatible ones.

use std::{
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use csv::{ByteRecord, Position};
use encoding_rs::{Encoding, UTF_8};

use crate::error::{BuildError, Error};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, BuildError> {
    let Some(value) = label else {
        return Ok(UTF_8);
    };
    let encoding = Encoding::for_label(value.trim().as_bytes())
        .ok_or_else(|| BuildError::UnknownEncoding(value.to_string()))?;
    if !encoding.is_ascii_compatible() {
        return Err(BuildError::UnsupportedEncoding(encoding.name()));
    }
    Ok(encoding)
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

/// Splits input into one [`ByteRecord`] per line.
///
/// Every line is a record, blank ones included: a blank line holds a single
/// empty cell. Lines end at `\n` with an optional `\r` before it, and a UTF-8
/// byte order mark is dropped from the first line.
pub struct RecordReader<R> {
    inner: BufReader<R>,
    delimiter: u8,
    line: u64,
    buffer: Vec<u8>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R, delimiter: u8) -> Self {
        Self {
            inner: BufReader::new(reader),
            delimiter,
            line: 0,
            buffer: Vec::new(),
        }
    }

    /// 1-based line of the record read last.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn read_record(&mut self, record: &mut ByteRecord) -> io::Result<bool> {
        self.buffer.clear();
        if self.inner.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(false);
        }
        self.line += 1;

        let mut bytes = self.buffer.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }
        if self.line == 1 {
            if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
                bytes = rest;
            }
        }

        let delimiter = self.delimiter;
        record.clear();
        for cell in bytes.split(|byte| *byte == delimiter) {
            record.push_field(cell);
        }
        let mut position = Position::new();
        position.set_line(self.line);
        record.set_position(Some(position));
        Ok(true)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

pub fn decode_record(
    record: &ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<String>, Error> {
    let line = record.position().map(|pos| pos.line()).unwrap_or_default();
    record
        .iter()
        .map(|field| {
            decode_bytes(field, encoding).ok_or(Error::Decode {
                line,
                encoding: encoding.name(),
            })
        })
        .collect()
}

use std::{fmt, str::FromStr};

use anyhow::{Context, Result, anyhow, bail, ensure};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::record::FieldKind;

/// A converted cell, before it is narrowed into the record's field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i128),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Duration(TimeDelta),
    Guid(Uuid),
    Enum(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Guid(_) => "guid",
            Value::Enum(_) => "enum",
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) | Value::Enum(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
            Value::Duration(d) => format_duration(d),
            Value::Guid(g) => g.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%B %d, %Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    // A bare date means midnight.
    if let Some(midnight) = parse_naive_date(value)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight);
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

pub fn parse_naive_time(value: &str) -> Result<NaiveTime> {
    const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];
    for fmt in TIME_FORMATS {
        if let Ok(parsed) = NaiveTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as time"))
}

/// Parses `[-][d.]hh:mm[:ss[.fffffff]]`, or a bare number of days.
pub fn parse_duration(value: &str) -> Result<TimeDelta> {
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    ensure!(!body.is_empty(), "Failed to parse '{value}' as duration");

    let mut parts = body.split(':');
    let lead = parts.next().unwrap_or_default();
    let Some(minutes) = parts.next() else {
        let days = duration_component(lead, "days", value)?;
        let delta = TimeDelta::try_days(days)
            .ok_or_else(|| anyhow!("Duration '{value}' is out of range"))?;
        return Ok(if negative { -delta } else { delta });
    };
    let seconds = parts.next();
    ensure!(
        parts.next().is_none(),
        "Failed to parse '{value}' as duration: too many ':' separators"
    );

    let (days, hours) = match lead.split_once('.') {
        Some((days, hours)) => (
            duration_component(days, "days", value)?,
            duration_component(hours, "hours", value)?,
        ),
        None => (0, duration_component(lead, "hours", value)?),
    };
    let minutes = duration_component(minutes, "minutes", value)?;
    let (seconds, nanos) = match seconds {
        Some(raw) => match raw.split_once('.') {
            Some((whole, fraction)) => (
                duration_component(whole, "seconds", value)?,
                fraction_nanos(fraction, value)?,
            ),
            None => (duration_component(raw, "seconds", value)?, 0),
        },
        None => (0, 0),
    };
    ensure!(hours < 24, "Hours out of range in duration '{value}'");
    ensure!(minutes < 60, "Minutes out of range in duration '{value}'");
    ensure!(seconds < 60, "Seconds out of range in duration '{value}'");

    let total_seconds = days
        .checked_mul(86_400)
        .and_then(|secs| secs.checked_add(hours * 3_600 + minutes * 60 + seconds))
        .ok_or_else(|| anyhow!("Duration '{value}' is out of range"))?;
    let delta = TimeDelta::new(total_seconds, nanos)
        .ok_or_else(|| anyhow!("Duration '{value}' is out of range"))?;
    Ok(if negative { -delta } else { delta })
}

/// Parses a duration through a time-of-day pattern, measuring from midnight.
pub fn parse_duration_with_format(value: &str, format: &str) -> Result<TimeDelta> {
    let time = NaiveTime::parse_from_str(value, format)
        .with_context(|| format!("Parsing '{value}' with format '{format}'"))?;
    TimeDelta::new(
        i64::from(time.num_seconds_from_midnight()),
        time.nanosecond(),
    )
    .ok_or_else(|| anyhow!("Duration '{value}' is out of range"))
}

pub fn format_duration(delta: &TimeDelta) -> String {
    let sign = if *delta < TimeDelta::zero() { "-" } else { "" };
    let magnitude = delta.abs();
    let total = magnitude.num_seconds();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let nanos = magnitude.subsec_nanos();
    let mut rendered = String::from(sign);
    if days > 0 {
        rendered.push_str(&format!("{days}."));
    }
    rendered.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        rendered.push('.');
        rendered.push_str(fraction.trim_end_matches('0'));
    }
    rendered
}

fn duration_component(raw: &str, label: &str, value: &str) -> Result<i64> {
    ensure!(
        !raw.is_empty() && raw.chars().all(|ch| ch.is_ascii_digit()),
        "Failed to parse '{value}' as duration: invalid {label} component '{raw}'"
    );
    raw.parse::<i64>()
        .with_context(|| format!("Duration '{value}' has an out of range {label} component"))
}

fn fraction_nanos(raw: &str, value: &str) -> Result<u32> {
    ensure!(
        (1..=9).contains(&raw.len()) && raw.chars().all(|ch| ch.is_ascii_digit()),
        "Failed to parse '{value}' as duration: invalid fraction '{raw}'"
    );
    let padded = format!("{raw:0<9}");
    padded
        .parse::<u32>()
        .with_context(|| format!("Duration '{value}' has an invalid fraction"))
}

pub fn parse_boolean(value: &str) -> Result<bool> {
    let lowered = value.to_ascii_lowercase();
    match lowered.as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => bail!("Failed to parse '{value}' as boolean"),
    }
}

pub fn parse_guid(value: &str) -> Result<Uuid> {
    let trimmed = value.trim().trim_matches(|c| matches!(c, '{' | '}'));
    Uuid::parse_str(trimmed).with_context(|| format!("Failed to parse '{value}' as GUID"))
}

pub fn parse_decimal_literal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .with_context(|| format!("Failed to parse '{value}' as decimal"))
}

/// Parses `value` with the invariant rules of `kind`. Text is taken verbatim;
/// every other kind ignores surrounding whitespace.
pub fn parse_typed_value(value: &str, kind: &FieldKind) -> Result<Value> {
    let trimmed = value.trim();
    let parsed = match kind {
        FieldKind::Text => Value::Text(value.to_string()),
        FieldKind::Integer => {
            let parsed: i128 = trimmed
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        FieldKind::Float => {
            let parsed: f64 = trimmed
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            Value::Float(parsed)
        }
        FieldKind::Decimal => Value::Decimal(parse_decimal_literal(trimmed)?),
        FieldKind::Boolean => Value::Boolean(parse_boolean(trimmed)?),
        FieldKind::Date => Value::Date(parse_naive_date(trimmed)?),
        FieldKind::DateTime => Value::DateTime(parse_naive_datetime(trimmed)?),
        FieldKind::Time => Value::Time(parse_naive_time(trimmed)?),
        FieldKind::Duration => Value::Duration(parse_duration(trimmed)?),
        FieldKind::Guid => Value::Guid(parse_guid(trimmed)?),
        FieldKind::Enumeration(_) => {
            bail!("Enumeration values are matched through naming policies, not parsed")
        }
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_naive_date_supports_iso_and_invariant_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_naive_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_naive_date("05/06/2024").unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/06").unwrap(), expected);
        assert!(parse_naive_date("2024-13-01").is_err());
    }

    #[test]
    fn parse_naive_datetime_accepts_bare_dates_as_midnight() {
        let expected = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_naive_datetime("2023-12-31").unwrap(), expected);
    }

    #[test]
    fn parse_duration_handles_days_and_fractions() {
        assert_eq!(
            parse_duration("15:30:45").unwrap(),
            TimeDelta::new(15 * 3_600 + 30 * 60 + 45, 0).unwrap()
        );
        assert_eq!(
            parse_duration("1.02:00:00").unwrap(),
            TimeDelta::new(26 * 3_600, 0).unwrap()
        );
        assert_eq!(
            parse_duration("00:00:01.5").unwrap(),
            TimeDelta::new(1, 500_000_000).unwrap()
        );
        assert_eq!(parse_duration("-00:10").unwrap(), -TimeDelta::new(600, 0).unwrap());
        assert_eq!(parse_duration("3").unwrap(), TimeDelta::try_days(3).unwrap());
        assert!(parse_duration("25:00:00").is_err());
        assert!(parse_duration("1:2:3:4").is_err());
        assert!(parse_duration("ab:cd").is_err());
    }

    #[test]
    fn format_duration_mirrors_parser() {
        for raw in ["15:30:45", "1.02:00:00", "00:00:01.5", "-00:10:00"] {
            let parsed = parse_duration(raw).unwrap();
            assert_eq!(format_duration(&parsed), raw);
        }
    }

    #[test]
    fn parse_typed_value_handles_booleans_and_whitespace() {
        assert_eq!(
            parse_typed_value(" Yes ", &FieldKind::Boolean).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            parse_typed_value(" 42", &FieldKind::Integer).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            parse_typed_value(" padded ", &FieldKind::Text).unwrap(),
            Value::Text(" padded ".to_string())
        );
        assert!(parse_typed_value("maybe", &FieldKind::Boolean).is_err());
        assert!(parse_typed_value("4.2", &FieldKind::Integer).is_err());
    }

    #[test]
    fn parse_guid_accepts_braced_literals() {
        let raw = "550e8400-e29b-41d4-a716-446655440000";
        let expected = Uuid::parse_str(raw).unwrap();
        assert_eq!(parse_guid(raw).unwrap(), expected);
        assert_eq!(parse_guid(&format!("{{{raw}}}")).unwrap(), expected);
        assert!(parse_guid("not-a-guid").is_err());
    }
}

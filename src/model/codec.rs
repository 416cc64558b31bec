//! Value codecs - how typed values become query literals and back.
//!
//! One codec exists per primitive data type, optionally wrapped to accept
//! `NULL`. A codec is the only place that knows:
//!
//! - how to escape a [`Value`] into literal text for a query,
//! - how to parse a raw result cell (JSON, as delivered by the transport),
//! - how to format a value for display.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value as Cell;

use crate::sql::dialect::{Dialect, SqlDialect};

// =============================================================================
// Values
// =============================================================================

/// A typed value flowing through filters and decoded result rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The data type of this value, `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(DataType::String),
            Value::Number(_) => Some(DataType::Number),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Date(_) => Some(DataType::Date),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Data types
// =============================================================================

/// Primitive data types a codec can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        };
        f.write_str(name)
    }
}

/// A raw cell did not have the shape the codec expects.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected a {expected} cell, found {found}")]
    UnexpectedCell { expected: DataType, found: String },

    #[error("unparsable date: {0}")]
    InvalidDate(String),
}

// =============================================================================
// Codec
// =============================================================================

/// Escapes, parses and formats values of one data type.
///
/// Codecs are immutable and `Copy`; the nullable variant is obtained with
/// [`Codec::nullable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    data_type: DataType,
    nullable: bool,
}

impl Codec {
    pub const fn string() -> Self {
        Self::of(DataType::String)
    }

    pub const fn number() -> Self {
        Self::of(DataType::Number)
    }

    pub const fn boolean() -> Self {
        Self::of(DataType::Boolean)
    }

    pub const fn date() -> Self {
        Self::of(DataType::Date)
    }

    pub const fn of(data_type: DataType) -> Self {
        Self {
            data_type,
            nullable: false,
        }
    }

    /// The same codec, accepting `NULL`.
    pub const fn nullable(self) -> Self {
        Self {
            data_type: self.data_type,
            nullable: true,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Escape a value into literal text for the default dialect.
    pub fn escape(&self, value: &Value) -> String {
        self.escape_for_dialect(value, Dialect::default())
    }

    /// Escape a value into literal text for a specific dialect.
    ///
    /// Never fails: a value of another type is rendered as its own type's
    /// literal, and non-finite numbers become `NULL`.
    pub fn escape_for_dialect(&self, value: &Value, dialect: Dialect) -> String {
        if let Some(actual) = value.data_type() {
            if actual != self.data_type {
                tracing::warn!(
                    expected = %self.data_type,
                    actual = %actual,
                    "escaping value of mismatched type"
                );
            }
        }

        match value {
            Value::Null => dialect.format_null().to_string(),
            Value::String(s) => dialect.quote_string(s),
            Value::Number(n) => match number_literal(*n) {
                Some(literal) => literal,
                None => {
                    tracing::warn!(value = %n, "non-finite number escaped as NULL");
                    dialect.format_null().to_string()
                }
            },
            Value::Boolean(b) => dialect.format_bool(*b).to_string(),
            Value::Date(d) => dialect.format_timestamp(&iso_timestamp(d)),
        }
    }

    /// Parse a raw result cell into a value.
    ///
    /// JSON `null` always decodes to [`Value::Null`].
    pub fn parse(&self, raw: &Cell) -> Result<Value, DecodeError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        match self.data_type {
            DataType::String => match raw {
                Cell::String(s) => Ok(Value::String(s.clone())),
                Cell::Number(n) => Ok(Value::String(n.to_string())),
                Cell::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(self.unexpected(other)),
            },
            DataType::Number => match raw {
                Cell::Number(n) => n.as_f64().map(Value::Number).ok_or_else(|| self.unexpected(raw)),
                // Wide integers and decimals arrive as text
                Cell::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| self.unexpected(raw)),
                other => Err(self.unexpected(other)),
            },
            DataType::Boolean => match raw {
                Cell::Bool(b) => Ok(Value::Boolean(*b)),
                Cell::Number(n) => match n.as_i64() {
                    Some(0) => Ok(Value::Boolean(false)),
                    Some(1) => Ok(Value::Boolean(true)),
                    _ => Err(self.unexpected(raw)),
                },
                Cell::String(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "t" => Ok(Value::Boolean(true)),
                    "false" | "f" => Ok(Value::Boolean(false)),
                    _ => Err(self.unexpected(raw)),
                },
                other => Err(self.unexpected(other)),
            },
            DataType::Date => match raw {
                Cell::String(s) => parse_timestamp(s).map(Value::Date),
                Cell::Number(n) => n
                    .as_i64()
                    .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                    .map(Value::Date)
                    .ok_or_else(|| self.unexpected(raw)),
                other => Err(self.unexpected(other)),
            },
        }
    }

    /// Encode a value into the raw cell shape that [`Codec::parse`] accepts.
    pub fn encode(&self, value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Null,
            Value::String(s) => Cell::String(s.clone()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Cell::Number)
                .unwrap_or(Cell::Null),
            Value::Boolean(b) => Cell::Bool(*b),
            Value::Date(d) => Cell::String(iso_timestamp(d)),
        }
    }

    /// Format a value for display.
    pub fn format(&self, value: &Value) -> String {
        match value {
            Value::Null => "<NULL>".to_string(),
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn unexpected(&self, raw: &Cell) -> DecodeError {
        DecodeError::UnexpectedCell {
            expected: self.data_type,
            found: raw.to_string(),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_literal(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(format!("{}", n as i64));
    }
    let mut buffer = ryu::Buffer::new();
    Some(buffer.format_finite(n).to_string())
}

/// RFC 3339 text with only as many fractional digits as the value carries.
fn iso_timestamp(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DecodeError> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Ok(d.with_timezone(&Utc));
    }
    // e.g. `2024-01-02 03:04:05+00` as printed for TIMESTAMPTZ
    if let Ok(d) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(d.with_timezone(&Utc));
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| DecodeError::InvalidDate(s.to_string()))
}

/// Group digits in thousands and keep at most three fraction digits.
fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }

    let fixed = format!("{:.3}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    let sign = if n < 0.0 && !is_zero { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

//! Cell values and datatypes.
//!
//! [`Value`] is the single value type flowing through cells, properties and
//! snapshots. Coercion from user input and display formatting live here so
//! storage and the document model agree on both.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The datatype of a [`Value`], used for column typing and enforcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Uuid,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "Bool",
            DataType::Int => "Int",
            DataType::Float => "Float",
            DataType::Text => "Text",
            DataType::Timestamp => "Timestamp",
            DataType::Uuid => "Uuid",
        }
    }

    /// Int and Float are interchangeable for enforcement purposes.
    pub fn accepts(&self, other: DataType) -> bool {
        match (self, other) {
            (DataType::Float, DataType::Int) => true,
            (a, b) => *a == b,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single table value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Uuid(_) => DataType::Uuid,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|n| usize::try_from(n).ok())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce raw user input into a value.
    ///
    /// - empty/whitespace input -> `None`
    /// - quoted string -> text without the quotes
    /// - `true`/`false` -> bool
    /// - integer literal -> int, float literal -> float
    /// - anything else -> text
    ///
    /// Numeric-looking strings with leading zeros (`007`) stay text so
    /// identifiers survive round-trips.
    pub fn from_input(input: &str) -> Option<Value> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            return Some(Value::Text(trimmed[1..trimmed.len() - 1].to_string()));
        }

        match trimmed {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            _ => {}
        }

        if has_leading_zero(trimmed) {
            return Some(Value::Text(trimmed.to_string()));
        }

        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Value::Int(n));
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return Some(Value::Float(n));
        }

        Some(Value::Text(trimmed.to_string()))
    }

    /// Render the value for display with optional precision, units, and a
    /// display-format template.
    ///
    /// The template may contain `{value}` and `{units}` tokens; without a
    /// template the formatted value is suffixed with the units, if any.
    pub fn format(
        &self,
        precision: Option<u32>,
        units: Option<&str>,
        display_format: Option<&str>,
    ) -> String {
        let base = match (self, precision) {
            (Value::Float(n), Some(p)) => format!("{:.*}", p as usize, n),
            (Value::Int(n), Some(p)) if p > 0 => format!("{:.*}", p as usize, *n as f64),
            _ => self.to_string(),
        };

        match display_format {
            Some(template) => {
                let with_value = value_token_re().replace_all(template, base.as_str());
                units_token_re()
                    .replace_all(&with_value, units.unwrap_or(""))
                    .into_owned()
            }
            None => match units {
                Some(u) if !u.is_empty() => format!("{} {}", base, u),
                _ => base,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

fn has_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    digits.len() > 1
        && digits.starts_with('0')
        && !digits.starts_with("0.")
        && digits.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
}

fn value_token_re() -> &'static Regex {
    static VALUE_RE: OnceLock<Regex> = OnceLock::new();
    VALUE_RE.get_or_init(|| Regex::new(r"\{value\}").expect("value token regex must compile"))
}

fn units_token_re() -> &'static Regex {
    static UNITS_RE: OnceLock<Regex> = OnceLock::new();
    UNITS_RE.get_or_init(|| Regex::new(r"\{units\}").expect("units token regex must compile"))
}

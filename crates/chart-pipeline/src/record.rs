// File: crates/chart-pipeline/src/record.rs
// Summary: Typed rows: a time key plus ordered named fields holding numbers (or raw text).

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;

/// A field value. Cells that do not parse as numbers keep their text.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Parse a csv cell, falling back to the original text.
    /// `NaN` is not a number here and stays text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if !n.is_nan() => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}

impl PartialOrd for Value {
    /// Numbers compare numerically and text lexically; mixed kinds are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// One row: the key (a point in time) and its fields in header order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub key: NaiveDateTime,
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(key: NaiveDateTime) -> Self {
        Self { key, fields: IndexMap::new() }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }

    /// Numeric value of `field`; `None` when missing or textual.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_number)
    }

    /// Numeric value of `field`, counting missing or textual cells as zero.
    pub fn number_or_zero(&self, field: &str) -> f64 { self.number(field).unwrap_or(0.0) }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Field names in insertion (header) order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

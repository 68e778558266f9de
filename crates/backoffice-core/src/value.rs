use chrono::{DateTime, Utc};
use serde_json::Value;

/// A typed column value used by sparse patches, inserts and query filters.
///
/// Stores bind these directly (PostgreSQL) or convert them to JSON (in-memory
/// store), so every variant must have an unambiguous representation in both.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Json(Value),
    Timestamp(DateTime<Utc>),
    Null,
}

impl ColumnValue {
    /// JSON representation matching how the entity serializes the same field.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Text(v) => Value::String(v.clone()),
            Self::Bool(v) => Value::Bool(*v),
            Self::Json(v) => v.clone(),
            Self::Timestamp(v) => serde_json::to_value(v).unwrap_or(Value::Null),
            Self::Null => Value::Null,
        }
    }

    /// Parse a raw query-string value. Integers stay integers, everything
    /// else is treated as text.
    pub fn parse_loose(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Int(v) => Some(v.to_string()),
            Self::Text(v) => Some(v.clone()),
            Self::Bool(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ColumnValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for ColumnValue {
    fn from(v: u64) -> Self {
        Self::Int(v as i64)
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Value> for ColumnValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

//! Core Database Backend Traits
//!
//! This module defines the backend seam used by the query executor, the value
//! type bound into statements and the row type returned from them.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::config::ConnectionConfig;
use crate::error::{ModelError, ModelResult};
use crate::sql::Statement;

use super::DatabaseBackendType;

/// A database backend runs one statement per call on a connection it opens
/// for that call alone.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Get the backend type
    fn backend_type(&self) -> DatabaseBackendType;

    /// Run a result-returning statement and collect every row
    async fn fetch_all(&self, config: &ConnectionConfig, statement: &Statement) -> ModelResult<Vec<Row>>;

    /// Run a statement that returns no rows
    async fn execute(&self, config: &ConnectionConfig, statement: &Statement) -> ModelResult<ExecuteOutcome>;
}

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub rows_affected: u64,
    /// Auto-generated identifier of the inserted row, when the statement produced one
    pub last_insert_id: Option<u64>,
}

/// Scalar value read from, or bound into, a statement
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int(i) => Some(*i),
            DatabaseValue::UInt(u) => i64::try_from(*u).ok(),
            DatabaseValue::Bool(b) => Some(i64::from(*b)),
            DatabaseValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int(i) => JsonValue::from(*i),
            DatabaseValue::UInt(u) => JsonValue::from(*u),
            DatabaseValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Bytes(b) => match std::str::from_utf8(b) {
                Ok(text) => JsonValue::String(text.to_string()),
                Err(_) => JsonValue::Array(b.iter().map(|&x| JsonValue::from(x)).collect()),
            },
            DatabaseValue::Json(j) => j.clone(),
        }
    }

    /// Create DatabaseValue from JSON value
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => DatabaseValue::Null,
            JsonValue::Bool(b) => DatabaseValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DatabaseValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    DatabaseValue::UInt(u)
                } else {
                    n.as_f64().map(DatabaseValue::Float).unwrap_or(DatabaseValue::Null)
                }
            }
            JsonValue::String(s) => DatabaseValue::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => DatabaseValue::Json(json.clone()),
        }
    }
}

impl fmt::Display for DatabaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseValue::Null => write!(f, "NULL"),
            DatabaseValue::Bool(b) => write!(f, "{}", b),
            DatabaseValue::Int(i) => write!(f, "{}", i),
            DatabaseValue::UInt(u) => write!(f, "{}", u),
            DatabaseValue::Float(v) => write!(f, "{}", v),
            DatabaseValue::String(s) => write!(f, "{}", s),
            DatabaseValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            DatabaseValue::Json(j) => write!(f, "{}", j),
        }
    }
}

impl Serialize for DatabaseValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DatabaseValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(|json| DatabaseValue::from_json(&json))
    }
}

impl From<&JsonValue> for DatabaseValue {
    fn from(value: &JsonValue) -> Self {
        DatabaseValue::from_json(value)
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        DatabaseValue::from_json(&value)
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int(i64::from(value))
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int(value)
    }
}

impl From<u64> for DatabaseValue {
    fn from(value: u64) -> Self {
        DatabaseValue::UInt(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// One result row: column names paired with their values, in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, DatabaseValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Append a column; builder form
    pub fn column(mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Get a column value by index
    pub fn get_by_index(&self, index: usize) -> ModelResult<&DatabaseValue> {
        self.columns
            .get(index)
            .map(|(_, value)| value)
            .ok_or_else(|| {
                ModelError::Serialization(format!(
                    "Column index {} out of bounds for row with {} columns",
                    index,
                    self.columns.len()
                ))
            })
    }

    /// Get a column value by name; the first column with that name wins
    pub fn get_by_name(&self, name: &str) -> ModelResult<&DatabaseValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
            .ok_or_else(|| ModelError::Serialization(format!("Column '{}' not found", name)))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Convert the row into an ordered JSON document.
    /// A repeated column name keeps its first position and its last value.
    pub fn into_json_map(self) -> Map<String, JsonValue> {
        let mut map = Map::with_capacity(self.columns.len());
        for (name, value) in self.columns {
            map.insert(name, value.to_json());
        }
        map
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<DatabaseValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

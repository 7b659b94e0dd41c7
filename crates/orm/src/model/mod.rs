//! Model System - schemaless records backed by database rows
//!
//! A `Model` is an ordered attribute bag populated from whatever row shape a
//! query returns. It is never synced automatically: the in-memory attributes
//! are the only source of truth between calls.
//!
//! - `query_methods`: finders (`all`, `where_raw`, `find`, `count`, `exists`)
//! - `crud_operations`: inserts, updates and deletes

pub mod crud_operations;
pub mod query_methods;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::backends::{DatabaseValue, Row};
use crate::error::{ModelError, ModelResult};

/// Primary key column used when the caller names none
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// One database record as an ordered column → value mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model {
    attributes: Map<String, JsonValue>,
}

impl Model {
    /// An empty model
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes(attributes: Map<String, JsonValue>) -> Self {
        Self { attributes }
    }

    /// Build a model from a JSON object; `null` gives an empty model
    pub fn create_from_array(value: JsonValue) -> ModelResult<Self> {
        match value {
            JsonValue::Object(attributes) => Ok(Self { attributes }),
            JsonValue::Null => Ok(Self::new()),
            other => Err(ModelError::Serialization(format!(
                "A model can only be built from an object, got {}",
                other
            ))),
        }
    }

    pub fn from_row(row: Row) -> Self {
        Self {
            attributes: row.into_json_map(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.get(key)
    }

    /// Like `get`, but a missing attribute is an error
    pub fn attribute(&self, key: &str) -> ModelResult<&JsonValue> {
        self.attributes
            .get(key)
            .ok_or_else(|| ModelError::MissingAttribute(key.to_string()))
    }

    /// Attribute converted for binding into a statement
    pub fn attribute_value(&self, key: &str) -> ModelResult<DatabaseValue> {
        self.attribute(key).map(DatabaseValue::from_json)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(JsonValue::as_str)
    }

    /// Integer attribute; numeric strings are accepted
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.attributes
            .get(key)
            .and_then(|value| DatabaseValue::from_json(value).as_i64())
    }

    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Set an attribute; builder form
    pub fn set(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set an attribute in place, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        self.attributes.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.attributes.shift_remove(key)
    }

    pub fn attributes(&self) -> &Map<String, JsonValue> {
        &self.attributes
    }

    pub fn into_attributes(self) -> Map<String, JsonValue> {
        self.attributes
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The full attribute document, as served to API clients
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.attributes.clone())
    }
}

impl From<Map<String, JsonValue>> for Model {
    fn from(attributes: Map<String, JsonValue>) -> Self {
        Self::from_attributes(attributes)
    }
}

impl From<Row> for Model {
    fn from(row: Row) -> Self {
        Self::from_row(row)
    }
}

impl TryFrom<JsonValue> for Model {
    type Error = ModelError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::create_from_array(value)
    }
}

impl<K, V> FromIterator<(K, V)> for Model
where
    K: Into<String>,
    V: Into<JsonValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

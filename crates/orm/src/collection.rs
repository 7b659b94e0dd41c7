//! ModelCollection - an ordered group of models
//!
//! Iteration follows insertion order and can be repeated any number of
//! times. Projection with `only` feeds the `IN (...)` lists of the batched
//! relationship helpers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCollection {
    models: Vec<Model>,
}

impl ModelCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_models(models: Vec<Model>) -> Self {
        Self { models }
    }

    /// Build a collection from a JSON array of objects
    pub fn create_from_array(value: JsonValue) -> ModelResult<Self> {
        match value {
            JsonValue::Array(items) => items.into_iter().map(Model::create_from_array).collect(),
            other => Err(ModelError::Serialization(format!(
                "A collection can only be built from an array, got {}",
                other
            ))),
        }
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    pub fn push(&mut self, model: Model) {
        self.add_model(model);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    pub fn first(&self) -> Option<&Model> {
        self.models.first()
    }

    /// Number of members
    pub fn count(&self) -> usize {
        self.models.len()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn into_models(self) -> Vec<Model> {
        self.models
    }

    /// Value of `column` for every member, in iteration order
    pub fn only(&self, column: &str) -> ModelResult<Vec<JsonValue>> {
        self.models
            .iter()
            .map(|model| model.attribute(column).cloned())
            .collect()
    }

    /// One tuple per member, each ordered as `columns`
    pub fn only_columns(&self, columns: &[&str]) -> ModelResult<Vec<Vec<JsonValue>>> {
        self.models
            .iter()
            .map(|model| {
                columns
                    .iter()
                    .map(|column| model.attribute(column).cloned())
                    .collect()
            })
            .collect()
    }

    /// Distinct non-null values of `column`, in first-seen order, ready for an `IN (...)` list
    pub(crate) fn key_values(&self, column: &str) -> ModelResult<Vec<DatabaseValue>> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for value in self.only(column)? {
            if value.is_null() || !seen.insert(value.to_string()) {
                continue;
            }
            values.push(DatabaseValue::from_json(&value));
        }
        Ok(values)
    }
}

impl IntoIterator for ModelCollection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.into_iter()
    }
}

impl<'a> IntoIterator for &'a ModelCollection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

impl FromIterator<Model> for ModelCollection {
    fn from_iter<I: IntoIterator<Item = Model>>(iter: I) -> Self {
        Self {
            models: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Model>> for ModelCollection {
    fn from(models: Vec<Model>) -> Self {
        Self::from_models(models)
    }
}

impl Extend<Model> for ModelCollection {
    fn extend<I: IntoIterator<Item = Model>>(&mut self, iter: I) {
        self.models.extend(iter);
    }
}

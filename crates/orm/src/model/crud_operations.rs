//! CRUD Operations - inserts, updates and deletes built from a model's attributes
//!
//! Every attribute currently on the model is written; there is no dirty
//! tracking. Each call is one round trip with no batching.

use serde_json::{Map, Value as JsonValue};

use crate::database::Database;
use crate::error::ModelResult;
use crate::sql::{self, Condition};

use super::{Model, DEFAULT_PRIMARY_KEY};

impl Model {
    /// `INSERT INTO {table}(...) VALUES(...)` over every attribute.
    ///
    /// Returns the generated id. When the model's `id` attribute is missing
    /// or null the generated id is recorded on it.
    pub async fn store(&mut self, db: &Database, table: &str) -> ModelResult<Option<u64>> {
        let statement = sql::insert(table, self.attributes())?;
        let outcome = db.execute(&statement).await?;

        if let Some(id) = outcome.last_insert_id {
            if self.get(DEFAULT_PRIMARY_KEY).map_or(true, JsonValue::is_null) {
                self.insert(DEFAULT_PRIMARY_KEY, id);
            }
        }

        Ok(outcome.last_insert_id)
    }

    /// Same as `store`
    pub async fn save(&mut self, db: &Database, table: &str) -> ModelResult<Option<u64>> {
        self.store(db, table).await
    }

    /// Build a model from `attributes` and store it
    pub async fn create(
        db: &Database,
        table: &str,
        attributes: Map<String, JsonValue>,
    ) -> ModelResult<Self> {
        let mut model = Self::from_attributes(attributes);
        model.store(db, table).await?;
        Ok(model)
    }

    /// `UPDATE {table} SET ... WHERE {condition}` over every attribute; returns rows affected
    pub async fn update(
        &self,
        db: &Database,
        table: &str,
        condition: impl Into<Condition>,
    ) -> ModelResult<u64> {
        let statement = sql::update(table, self.attributes(), &condition.into())?;
        Ok(db.execute(&statement).await?.rows_affected)
    }

    /// Update the row whose `primary_key` equals this model's value for it
    pub async fn update_by_id(&self, db: &Database, table: &str, primary_key: &str) -> ModelResult<u64> {
        let condition = self.key_condition(primary_key)?;
        self.update(db, table, condition).await
    }

    /// `DELETE FROM {table} WHERE {condition}`; returns rows affected
    pub async fn delete(db: &Database, table: &str, condition: impl Into<Condition>) -> ModelResult<u64> {
        let statement = sql::delete(table, &condition.into())?;
        Ok(db.execute(&statement).await?.rows_affected)
    }

    /// Delete the row whose `primary_key` equals this model's value for it
    pub async fn delete_by_id(&self, db: &Database, table: &str, primary_key: &str) -> ModelResult<u64> {
        let condition = self.key_condition(primary_key)?;
        Self::delete(db, table, condition).await
    }

    /// Re-read this model's row by `primary_key`, replacing every attribute
    pub async fn refresh(&mut self, db: &Database, table: &str, primary_key: &str) -> ModelResult<()> {
        let id = self.attribute_value(primary_key)?;
        *self = Self::find_by(db, table, primary_key, id, "*").await?;
        Ok(())
    }

    fn key_condition(&self, primary_key: &str) -> ModelResult<Condition> {
        Condition::eq(primary_key, self.attribute_value(primary_key)?)
    }
}

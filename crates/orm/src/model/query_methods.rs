//! Query Methods - finders returning models and collections
//!
//! Each finder builds one SELECT and performs one round trip through the
//! `Database` it is given.

use crate::backends::DatabaseValue;
use crate::collection::ModelCollection;
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::sql::{self, Columns, Condition};

use super::{Model, DEFAULT_PRIMARY_KEY};

impl Model {
    /// Every row of `table`; same as `where_raw` with an always-true condition
    pub async fn all(
        db: &Database,
        table: &str,
        columns: impl Into<Columns>,
    ) -> ModelResult<ModelCollection> {
        Self::where_raw(db, table, Condition::always(), columns, "").await
    }

    /// `SELECT {columns} FROM {table} WHERE {conditions} {extra}`.
    ///
    /// `conditions` and `extra` (ORDER BY, LIMIT, ...) are written into the
    /// statement as given.
    pub async fn where_raw(
        db: &Database,
        table: &str,
        conditions: impl Into<Condition>,
        columns: impl Into<Columns>,
        extra: &str,
    ) -> ModelResult<ModelCollection> {
        let statement = sql::select(table, &columns.into(), &conditions.into(), extra)?;
        Self::fetch(db, &statement).await
    }

    /// Find a row by its `id` column
    pub async fn find(db: &Database, table: &str, id: impl Into<DatabaseValue>) -> ModelResult<Self> {
        Self::find_by(db, table, DEFAULT_PRIMARY_KEY, id, Columns::All).await
    }

    /// Find a row by `id_column`, failing with `NotFound` when no row matches
    pub async fn find_by(
        db: &Database,
        table: &str,
        id_column: &str,
        id: impl Into<DatabaseValue>,
        columns: impl Into<Columns>,
    ) -> ModelResult<Self> {
        let id = id.into();
        Self::find_by_or_none(db, table, id_column, id.clone(), columns)
            .await?
            .ok_or_else(|| ModelError::not_found(table, id_column, id))
    }

    /// Find a row by `id_column`, if there is one
    pub async fn find_by_or_none(
        db: &Database,
        table: &str,
        id_column: &str,
        id: impl Into<DatabaseValue>,
        columns: impl Into<Columns>,
    ) -> ModelResult<Option<Self>> {
        let statement = sql::select_by_id(table, id_column, id, &columns.into())?;
        let rows = db.fetch_all(&statement).await?;
        Ok(rows.into_iter().next().map(Model::from_row))
    }

    /// `SELECT count(*) as count FROM {table} WHERE {conditions}`
    pub async fn count(db: &Database, table: &str, conditions: impl Into<Condition>) -> ModelResult<i64> {
        let statement = sql::count(table, &conditions.into())?;
        let rows = db.fetch_all(&statement).await?;

        let row = rows
            .first()
            .ok_or_else(|| ModelError::query("count returned no rows", statement.sql()))?;
        row.get_by_name("count")?.as_i64().ok_or_else(|| {
            ModelError::Serialization(format!(
                "count for table '{}' is not an integer",
                table
            ))
        })
    }

    /// True when at least one row matches
    pub async fn exists(db: &Database, table: &str, conditions: impl Into<Condition>) -> ModelResult<bool> {
        Ok(Self::count(db, table, conditions).await? > 0)
    }

    pub(crate) async fn fetch(db: &Database, statement: &sql::Statement) -> ModelResult<ModelCollection> {
        let rows = db.fetch_all(statement).await?;
        Ok(rows.into_iter().map(Model::from_row).collect())
    }
}

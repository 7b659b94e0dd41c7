//! ManyToOne - the row a model's foreign key points at

use crate::collection::ModelCollection;
use crate::database::Database;
use crate::error::ModelResult;
use crate::model::{Model, DEFAULT_PRIMARY_KEY};
use crate::sql::{self, Columns};

use super::batch_condition;

/// The row of `table` whose `ref_col` equals the owner's `foreign_col`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToOne {
    pub table: String,
    pub foreign_col: String,
    pub ref_col: String,
    pub columns: Columns,
}

impl ManyToOne {
    pub fn new(table: impl Into<String>, foreign_col: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            foreign_col: foreign_col.into(),
            ref_col: DEFAULT_PRIMARY_KEY.to_string(),
            columns: Columns::All,
        }
    }

    /// Key column of the related table
    pub fn ref_col(mut self, ref_col: impl Into<String>) -> Self {
        self.ref_col = ref_col.into();
        self
    }

    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    /// `SELECT ... FROM {table} WHERE {ref_col} IN (...)`; `None` when no owner has a key value
    pub fn statement_for_all(&self, owners: &ModelCollection) -> ModelResult<Option<sql::Statement>> {
        let Some(condition) = batch_condition(owners, &self.foreign_col, &self.ref_col)? else {
            return Ok(None);
        };
        sql::select(&self.table, &self.columns, &condition, "").map(Some)
    }
}

impl Model {
    /// The related row; `NotFound` when the key matches nothing
    pub async fn many_to_one(&self, db: &Database, relation: &ManyToOne) -> ModelResult<Model> {
        let id = self.attribute_value(&relation.foreign_col)?;
        Self::find_by(db, &relation.table, &relation.ref_col, id, &relation.columns).await
    }
}

impl ModelCollection {
    /// Related rows for every member, in one query. Members sharing a key
    /// share one row in the result.
    pub async fn many_to_one(&self, db: &Database, relation: &ManyToOne) -> ModelResult<ModelCollection> {
        match relation.statement_for_all(self)? {
            Some(statement) => Model::fetch(db, &statement).await,
            None => Ok(ModelCollection::new()),
        }
    }
}

//! OneToMany - rows of another table pointing back at a model

use crate::collection::ModelCollection;
use crate::database::Database;
use crate::error::ModelResult;
use crate::model::{Model, DEFAULT_PRIMARY_KEY};
use crate::sql::{self, Columns, Condition};

use super::batch_condition;

/// Rows of `table` whose `foreign_col` equals the owner's `ref_col`
#[derive(Debug, Clone, PartialEq)]
pub struct OneToMany {
    pub table: String,
    pub foreign_col: String,
    pub ref_col: String,
    pub conditions: Condition,
    pub columns: Columns,
}

impl OneToMany {
    pub fn new(table: impl Into<String>, foreign_col: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            foreign_col: foreign_col.into(),
            ref_col: DEFAULT_PRIMARY_KEY.to_string(),
            conditions: Condition::always(),
            columns: Columns::All,
        }
    }

    /// Owner column the foreign column points at
    pub fn ref_col(mut self, ref_col: impl Into<String>) -> Self {
        self.ref_col = ref_col.into();
        self
    }

    /// Extra condition intersected with the key match
    pub fn conditions(mut self, conditions: impl Into<Condition>) -> Self {
        self.conditions = conditions.into();
        self
    }

    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    /// `SELECT ... FROM {table} WHERE {foreign_col} = ? AND ({conditions})`
    pub fn statement_for(&self, owner: &Model) -> ModelResult<sql::Statement> {
        let condition = Condition::eq(&self.foreign_col, owner.attribute_value(&self.ref_col)?)?
            .and(self.conditions.clone());
        sql::select(&self.table, &self.columns, &condition, "")
    }

    /// Batched form of `statement_for`; `None` when no owner has a key value
    pub fn statement_for_all(&self, owners: &ModelCollection) -> ModelResult<Option<sql::Statement>> {
        let Some(condition) = batch_condition(owners, &self.ref_col, &self.foreign_col)? else {
            return Ok(None);
        };
        sql::select(
            &self.table,
            &self.columns,
            &condition.and(self.conditions.clone()),
            "",
        )
        .map(Some)
    }
}

impl Model {
    /// Every row of the related table belonging to this model
    pub async fn one_to_many(&self, db: &Database, relation: &OneToMany) -> ModelResult<ModelCollection> {
        let statement = relation.statement_for(self)?;
        Self::fetch(db, &statement).await
    }
}

impl ModelCollection {
    /// Related rows for every member, in one query
    pub async fn one_to_many(&self, db: &Database, relation: &OneToMany) -> ModelResult<ModelCollection> {
        match relation.statement_for_all(self)? {
            Some(statement) => Model::fetch(db, &statement).await,
            None => Ok(ModelCollection::new()),
        }
    }
}

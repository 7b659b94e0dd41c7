//! ManyToMany - rows linked to a model through an intermediate table
//!
//! The related table is joined to the intermediate table and filtered on the
//! intermediate table's reference to the owner. Projected columns are
//! qualified with the related table so intermediate columns never leak into
//! the result.

use crate::collection::ModelCollection;
use crate::database::Database;
use crate::error::ModelResult;
use crate::model::{Model, DEFAULT_PRIMARY_KEY};
use crate::sql::{self, Columns, Condition};

use super::batch_condition;

#[derive(Debug, Clone, PartialEq)]
pub struct ManyToMany {
    pub table: String,
    pub intermediate: String,
    /// Intermediate column referencing the owner
    pub intr_local_ref: String,
    /// Intermediate column referencing `table`
    pub intr_table_ref: String,
    /// Owner key
    pub local_id: String,
    /// Key of `table`
    pub table_id: String,
    pub conditions: Condition,
    pub columns: Columns,
}

impl ManyToMany {
    pub fn new(
        table: impl Into<String>,
        intermediate: impl Into<String>,
        intr_local_ref: impl Into<String>,
        intr_table_ref: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            intermediate: intermediate.into(),
            intr_local_ref: intr_local_ref.into(),
            intr_table_ref: intr_table_ref.into(),
            local_id: DEFAULT_PRIMARY_KEY.to_string(),
            table_id: DEFAULT_PRIMARY_KEY.to_string(),
            conditions: Condition::always(),
            columns: Columns::All,
        }
    }

    pub fn local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = local_id.into();
        self
    }

    pub fn table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = table_id.into();
        self
    }

    pub fn conditions(mut self, conditions: impl Into<Condition>) -> Self {
        self.conditions = conditions.into();
        self
    }

    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    fn local_ref(&self) -> String {
        format!("{}.{}", self.intermediate, self.intr_local_ref)
    }

    fn statement(&self, key: Condition) -> ModelResult<sql::Statement> {
        let from = sql::inner_join(
            &self.table,
            &self.intermediate,
            &self.table_id,
            &self.intr_table_ref,
        )?;
        Ok(sql::select_from(
            &from,
            &self.columns.qualified(&self.table),
            &key.and(self.conditions.clone()),
            "",
        ))
    }

    /// `SELECT {table}.* FROM {table} INNER JOIN {intermediate} ON ... WHERE {intermediate}.{intr_local_ref} = ? AND ({conditions})`
    pub fn statement_for(&self, owner: &Model) -> ModelResult<sql::Statement> {
        let key = Condition::eq(&self.local_ref(), owner.attribute_value(&self.local_id)?)?;
        self.statement(key)
    }

    /// Batched form of `statement_for`; `None` when no owner has a key value
    pub fn statement_for_all(&self, owners: &ModelCollection) -> ModelResult<Option<sql::Statement>> {
        match batch_condition(owners, &self.local_id, &self.local_ref())? {
            Some(key) => self.statement(key).map(Some),
            None => Ok(None),
        }
    }
}

impl Model {
    pub async fn many_to_many(&self, db: &Database, relation: &ManyToMany) -> ModelResult<ModelCollection> {
        let statement = relation.statement_for(self)?;
        Self::fetch(db, &statement).await
    }
}

impl ModelCollection {
    /// Related rows for every member, in one query. A row linked to several
    /// members appears once per link.
    pub async fn many_to_many(&self, db: &Database, relation: &ManyToMany) -> ModelResult<ModelCollection> {
        match relation.statement_for_all(self)? {
            Some(statement) => Model::fetch(db, &statement).await,
            None => Ok(ModelCollection::new()),
        }
    }
}

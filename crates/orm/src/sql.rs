//! SQL statement construction
//!
//! Every statement the ORM issues is built here. Caller-supplied table names,
//! column lists, conditions and trailing clauses are interpolated as text;
//! values taken from models or passed as ids are bound as `?` parameters.

use std::fmt;

use serde_json::{Map, Value as JsonValue};

use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};
use crate::security::{
    escape_identifier, escape_identifier_path, validate_identifier, validate_table_name,
};

/// Condition used when the caller supplies none
pub const ALWAYS_TRUE: &str = "1";

/// A complete SQL statement and the values bound to its placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<DatabaseValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<DatabaseValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bind the next placeholder
    pub fn bind(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[DatabaseValue] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<DatabaseValue>) {
        (self.sql, self.params)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Column projection of a SELECT
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Columns {
    #[default]
    All,
    List(Vec<String>),
}

impl Columns {
    pub fn to_sql(&self) -> String {
        match self {
            Columns::All => "*".to_string(),
            Columns::List(columns) if columns.is_empty() => "*".to_string(),
            Columns::List(columns) => columns.join(", "),
        }
    }

    /// Prefix every column with `table.`
    pub fn qualified(&self, table: &str) -> String {
        match self {
            Columns::List(columns) if !columns.is_empty() => columns
                .iter()
                .map(|column| format!("{}.{}", table, column))
                .collect::<Vec<_>>()
                .join(", "),
            _ => format!("{}.*", table),
        }
    }
}

impl From<&str> for Columns {
    /// `"*"` selects everything; anything else is a comma separated list
    fn from(columns: &str) -> Self {
        let trimmed = columns.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Columns::All;
        }
        Columns::List(
            trimmed
                .split(',')
                .map(|column| column.trim().to_string())
                .filter(|column| !column.is_empty())
                .collect(),
        )
    }
}

impl From<String> for Columns {
    fn from(columns: String) -> Self {
        Columns::from(columns.as_str())
    }
}

impl From<Vec<String>> for Columns {
    fn from(columns: Vec<String>) -> Self {
        Columns::List(columns)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(columns: Vec<&str>) -> Self {
        Columns::List(columns.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Columns {
    fn from(columns: &[&str]) -> Self {
        Columns::List(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(columns: [&str; N]) -> Self {
        Columns::List(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl From<&Columns> for Columns {
    fn from(columns: &Columns) -> Self {
        columns.clone()
    }
}

/// A WHERE condition: raw SQL text plus the values bound inside it
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    sql: String,
    params: Vec<DatabaseValue>,
}

impl Condition {
    /// Caller-written SQL; an empty string means "every row"
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let sql = if sql.trim().is_empty() {
            ALWAYS_TRUE.to_string()
        } else {
            sql
        };
        Self {
            sql,
            params: Vec::new(),
        }
    }

    pub fn always() -> Self {
        Self::raw(ALWAYS_TRUE)
    }

    /// `{column} = ?`
    pub fn eq(column: &str, value: impl Into<DatabaseValue>) -> ModelResult<Self> {
        validate_identifier_path(column)?;
        Ok(Self {
            sql: format!("{} = ?", escape_identifier_path(column)),
            params: vec![value.into()],
        })
    }

    /// `{column} IN (?, ?, ...)`; an empty list is rejected since `IN ()` is invalid SQL
    pub fn in_list(column: &str, values: Vec<DatabaseValue>) -> ModelResult<Self> {
        validate_identifier_path(column)?;
        if values.is_empty() {
            return Err(ModelError::Validation(format!(
                "IN list for '{}' cannot be empty",
                column
            )));
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        Ok(Self {
            sql: format!("{} IN ({})", escape_identifier_path(column), placeholders),
            params: values,
        })
    }

    /// `{self} AND ({other})`
    pub fn and(mut self, other: Condition) -> Self {
        self.sql = format!("{} AND ({})", self.sql, other.sql);
        self.params.extend(other.params);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[DatabaseValue] {
        &self.params
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::always()
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::raw(sql)
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::raw(sql)
    }
}

impl From<&String> for Condition {
    fn from(sql: &String) -> Self {
        Condition::raw(sql.as_str())
    }
}

impl From<&Condition> for Condition {
    fn from(condition: &Condition) -> Self {
        condition.clone()
    }
}

/// `SELECT {columns} FROM {table} WHERE {condition} {extra}`
pub fn select(table: &str, columns: &Columns, condition: &Condition, extra: &str) -> ModelResult<Statement> {
    validate_table_name(table)?;
    Ok(select_from(table, &columns.to_sql(), condition, extra))
}

/// SELECT over an arbitrary FROM clause the ORM assembled itself
pub(crate) fn select_from(from: &str, columns: &str, condition: &Condition, extra: &str) -> Statement {
    let mut sql = format!("SELECT {} FROM {} WHERE {}", columns, from, condition.sql);
    let extra = extra.trim();
    if !extra.is_empty() {
        sql.push(' ');
        sql.push_str(extra);
    }
    Statement::with_params(sql, condition.params.clone())
}

/// `SELECT {columns} FROM {table} WHERE {id_column} = ? LIMIT 1`
pub fn select_by_id(
    table: &str,
    id_column: &str,
    id: impl Into<DatabaseValue>,
    columns: &Columns,
) -> ModelResult<Statement> {
    validate_table_name(table)?;
    let condition = Condition::eq(id_column, id)?;
    Ok(select_from(table, &columns.to_sql(), &condition, "LIMIT 1"))
}

/// `SELECT count(*) as count FROM {table} WHERE {condition}`
pub fn count(table: &str, condition: &Condition) -> ModelResult<Statement> {
    validate_table_name(table)?;
    Ok(select_from(table, "count(*) as count", condition, ""))
}

/// `INSERT INTO {table}({columns}) VALUES(?, ...)` over every attribute
pub fn insert(table: &str, attributes: &Map<String, JsonValue>) -> ModelResult<Statement> {
    validate_table_name(table)?;

    let mut columns = Vec::with_capacity(attributes.len());
    let mut params = Vec::with_capacity(attributes.len());
    for (column, value) in attributes {
        validate_identifier(column)?;
        columns.push(escape_identifier(column));
        params.push(DatabaseValue::from_json(value));
    }

    let sql = format!(
        "INSERT INTO {}({}) VALUES({})",
        table,
        columns.join(", "),
        vec!["?"; params.len()].join(", ")
    );
    Ok(Statement::with_params(sql, params))
}

/// `UPDATE {table} SET {c1} = ?, ... WHERE {condition}` over every attribute
pub fn update(table: &str, attributes: &Map<String, JsonValue>, condition: &Condition) -> ModelResult<Statement> {
    validate_table_name(table)?;
    if attributes.is_empty() {
        return Err(ModelError::Validation(format!(
            "Nothing to update in table '{}': the model has no attributes",
            table
        )));
    }

    let mut assignments = Vec::with_capacity(attributes.len());
    let mut params = Vec::with_capacity(attributes.len() + condition.params.len());
    for (column, value) in attributes {
        validate_identifier(column)?;
        assignments.push(format!("{} = ?", escape_identifier(column)));
        params.push(DatabaseValue::from_json(value));
    }
    params.extend(condition.params.iter().cloned());

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignments.join(", "),
        condition.sql
    );
    Ok(Statement::with_params(sql, params))
}

/// `DELETE FROM {table} WHERE {condition}`
pub fn delete(table: &str, condition: &Condition) -> ModelResult<Statement> {
    validate_table_name(table)?;
    Ok(Statement::with_params(
        format!("DELETE FROM {} WHERE {}", table, condition.sql),
        condition.params.clone(),
    ))
}

/// `{table} INNER JOIN {intermediate} ON {table}.{table_id} = {intermediate}.{intr_table_ref}`,
/// with the join columns quoted
pub fn inner_join(table: &str, intermediate: &str, table_id: &str, intr_table_ref: &str) -> ModelResult<String> {
    validate_table_name(table)?;
    validate_table_name(intermediate)?;
    validate_identifier(table_id)?;
    validate_identifier(intr_table_ref)?;
    Ok(format!(
        "{} INNER JOIN {} ON {}.{} = {}.{}",
        table,
        intermediate,
        escape_identifier_path(table),
        escape_identifier(table_id),
        escape_identifier_path(intermediate),
        escape_identifier(intr_table_ref)
    ))
}

/// Column references may be qualified (`pivot.user_id`)
fn validate_identifier_path(column: &str) -> ModelResult<()> {
    match column.split_once('.') {
        Some((table, column)) => {
            validate_table_name(table)?;
            validate_identifier(column)
        }
        None => validate_identifier(column),
    }
}

//! SQLite Backend Implementation
//!
//! Same one-connection-per-call contract as the MySQL backend, against a
//! database file. The statement shapes the ORM emits are valid in both.

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row as SqlxRow, TypeInfo, ValueRef};

use crate::config::ConnectionConfig;
use crate::error::{ModelError, ModelResult};
use crate::sql::Statement;

use super::core::*;
use super::DatabaseBackendType;

/// SQLite database backend implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteBackend;

impl SqliteBackend {
    pub fn new() -> Self {
        Self
    }

    async fn open(config: &ConnectionConfig) -> ModelResult<SqliteConnection> {
        tracing::debug!("Opening SQLite connection to {}", config.display_target());
        let options = SqliteConnectOptions::new()
            .filename(&config.database)
            .create_if_missing(true);

        SqliteConnection::connect_with(&options).await.map_err(|e| {
            ModelError::Connection(format!(
                "Failed to open {}: {}",
                config.display_target(),
                e
            ))
        })
    }

    async fn close(conn: SqliteConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close SQLite connection cleanly: {}", e);
        }
    }
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn fetch_all(&self, config: &ConnectionConfig, statement: &Statement) -> ModelResult<Vec<Row>> {
        let mut conn = Self::open(config).await?;

        let result = bind_statement(statement)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| ModelError::query(e.to_string(), statement.sql()));
        Self::close(conn).await;

        result?.iter().map(decode_row).collect()
    }

    async fn execute(&self, config: &ConnectionConfig, statement: &Statement) -> ModelResult<ExecuteOutcome> {
        let mut conn = Self::open(config).await?;

        let result = bind_statement(statement)
            .execute(&mut conn)
            .await
            .map_err(|e| ModelError::query(e.to_string(), statement.sql()));
        Self::close(conn).await;

        let done = result?;
        Ok(ExecuteOutcome {
            rows_affected: done.rows_affected(),
            last_insert_id: u64::try_from(done.last_insert_rowid())
                .ok()
                .filter(|id| *id > 0),
        })
    }
}

fn bind_statement(statement: &Statement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    statement
        .params()
        .iter()
        .fold(sqlx::query(statement.sql()), bind_database_value)
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'a>(
    query: Query<'a, Sqlite, SqliteArguments<'a>>,
    value: &DatabaseValue,
) -> Query<'a, Sqlite, SqliteArguments<'a>> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int(i) => query.bind(*i),
        // SQLite integers are signed 64-bit
        DatabaseValue::UInt(u) => match i64::try_from(*u) {
            Ok(i) => query.bind(i),
            Err(_) => query.bind(u.to_string()),
        },
        DatabaseValue::Float(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Json(j) => query.bind(sqlx::types::Json(j.clone())),
    }
}

fn decode_row(row: &SqliteRow) -> ModelResult<Row> {
    let mut decoded = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        decoded.push(column.name(), sqlite_value_to_database_value(row, index)?);
    }
    Ok(decoded)
}

/// Convert a SQLite value to DatabaseValue, going by the storage class of the value itself
fn sqlite_value_to_database_value(row: &SqliteRow, index: usize) -> ModelResult<DatabaseValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => DatabaseValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "INTEGER" => DatabaseValue::Int(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => DatabaseValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => DatabaseValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => DatabaseValue::String(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}

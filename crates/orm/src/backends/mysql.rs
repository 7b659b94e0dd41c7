//! MySQL Backend Implementation
//!
//! Uses sqlx as the underlying driver. Every call opens its own connection
//! from the `ConnectionConfig`, runs one statement and closes the connection.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Row as SqlxRow, TypeInfo, ValueRef};

use crate::config::ConnectionConfig;
use crate::error::{ModelError, ModelResult};
use crate::sql::Statement;

use super::core::*;
use super::DatabaseBackendType;

/// MySQL database backend implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlBackend;

impl MySqlBackend {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
    }

    async fn open(config: &ConnectionConfig) -> ModelResult<MySqlConnection> {
        tracing::debug!("Opening MySQL connection to {}", config.display_target());
        MySqlConnection::connect_with(&Self::connect_options(config))
            .await
            .map_err(|e| {
                ModelError::Connection(format!(
                    "Failed to connect to {}: {}",
                    config.display_target(),
                    e
                ))
            })
    }

    async fn close(conn: MySqlConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close MySQL connection cleanly: {}", e);
        }
    }
}

#[async_trait]
impl DatabaseBackend for MySqlBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::MySQL
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
            last_insert_id: Some(done.last_insert_id()).filter(|id| *id > 0),
        })
    }
}

fn bind_statement(statement: &Statement) -> Query<'_, MySql, MySqlArguments> {
    statement
        .params()
        .iter()
        .fold(sqlx::query(statement.sql()), bind_database_value)
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'a>(
    query: Query<'a, MySql, MySqlArguments>,
    value: &DatabaseValue,
) -> Query<'a, MySql, MySqlArguments> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int(i) => query.bind(*i),
        DatabaseValue::UInt(u) => query.bind(*u),
        DatabaseValue::Float(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Json(j) => query.bind(sqlx::types::Json(j.clone())),
    }
}

fn decode_row(row: &MySqlRow) -> ModelResult<Row> {
    let mut decoded = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        decoded.push(column.name(), mysql_value_to_database_value(row, index)?);
    }
    Ok(decoded)
}

/// Convert a MySQL column value to DatabaseValue
fn mysql_value_to_database_value(row: &MySqlRow, index: usize) -> ModelResult<DatabaseValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => DatabaseValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        unsigned if unsigned.ends_with("UNSIGNED") => {
            DatabaseValue::UInt(row.try_get_unchecked::<u64, _>(index)?)
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            DatabaseValue::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        "FLOAT" => DatabaseValue::Float(f64::from(row.try_get_unchecked::<f32, _>(index)?)),
        "DOUBLE" => DatabaseValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "DATE" => DatabaseValue::String(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
        "TIME" => DatabaseValue::String(row.try_get::<chrono::NaiveTime, _>(index)?.to_string()),
        "DATETIME" => {
            DatabaseValue::String(row.try_get::<chrono::NaiveDateTime, _>(index)?.to_string())
        }
        "TIMESTAMP" => DatabaseValue::String(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                .naive_utc()
                .to_string(),
        ),
        "JSON" => DatabaseValue::Json(row.try_get::<JsonValue, _>(index)?),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => DatabaseValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        // VARCHAR, CHAR, TEXT, DECIMAL, ENUM, SET all arrive as text
        _ => DatabaseValue::String(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}

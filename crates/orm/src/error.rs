//! Error types for the ORM system
//!
//! Every failure surfaces to the immediate caller as a `ModelError`. Nothing is
//! retried and nothing is recovered locally.

use std::time::Duration;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for ORM operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// The database could not be reached or refused the credentials
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected a statement
    #[error("Query error: {message} (query: {sql})")]
    Query { message: String, sql: String },

    /// A by-id lookup matched no row
    #[error("Record not found in table '{table}' where {column} = {id}")]
    NotFound {
        table: String,
        column: String,
        id: String,
    },

    /// Required connection parameters are missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An identifier the ORM would place into SQL is not acceptable
    #[error("Validation error: {0}")]
    Validation(String),

    /// A model has no value for an attribute an operation needs
    #[error("Attribute '{0}' is not set on this model")]
    MissingAttribute(String),

    /// A row or document could not be converted
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A round trip exceeded the configured deadline
    #[error("Database round trip timed out after {0:?}")]
    Timeout(Duration),
}

impl ModelError {
    /// Build a query failure carrying the driver message and the statement text
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        ModelError::Query {
            message: message.into(),
            sql: sql.into(),
        }
    }

    /// Build a not-found error for a by-id lookup
    pub fn not_found(table: &str, column: &str, id: impl std::fmt::Display) -> Self {
        ModelError::NotFound {
            table: table.to_string(),
            column: column.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        let message = err.to_string();
        match err {
            sqlx::Error::Configuration(_) => ModelError::Configuration(message),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => ModelError::Connection(message),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                ModelError::Serialization(message)
            }
            _ => ModelError::query(message, String::new()),
        }
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ModelError {
    fn from(err: url::ParseError) -> Self {
        ModelError::Configuration(format!("Invalid database URL: {}", err))
    }
}

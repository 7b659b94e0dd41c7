//! Query executor
//!
//! `Database` owns a `ConnectionConfig` and a backend. Each call runs exactly
//! one statement on a connection opened for that call and closed before the
//! call returns. The outcome of the most recent call is kept for the
//! `last_insert_id` and `last_error` accessors. Both are recorded under one
//! lock, so they always describe the same statement even when calls overlap.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backends::{
    DatabaseBackend, DatabaseBackendType, ExecuteOutcome, MySqlBackend, Row, SqliteBackend,
};
use crate::config::ConnectionConfig;
use crate::error::{ModelError, ModelResult};
use crate::sql::Statement;

/// Outcome of the most recent round trip
#[derive(Debug, Default)]
struct LastOutcome {
    insert_id: Option<u64>,
    error: Option<String>,
}

pub struct Database {
    config: ConnectionConfig,
    backend: Arc<dyn DatabaseBackend>,
    last: Mutex<LastOutcome>,
}

impl Database {
    /// Create an executor for the backend named in the configuration.
    /// No connection is opened until the first statement runs.
    pub fn new(config: ConnectionConfig) -> ModelResult<Self> {
        let backend: Arc<dyn DatabaseBackend> = match config.backend {
            DatabaseBackendType::MySQL => Arc::new(MySqlBackend::new()),
            DatabaseBackendType::SQLite => Arc::new(SqliteBackend::new()),
        };
        Self::with_backend(config, backend)
    }

    /// Create an executor over any backend implementation
    pub fn with_backend(config: ConnectionConfig, backend: Arc<dyn DatabaseBackend>) -> ModelResult<Self> {
        config.validate()?;
        tracing::debug!(
            "Database executor configured for {} ({} backend)",
            config.display_target(),
            backend.backend_type()
        );
        Ok(Self {
            config,
            backend,
            last: Mutex::new(LastOutcome::default()),
        })
    }

    /// Create an executor from `DATABASE_URL` or the `DB_*` variables
    pub fn from_env() -> ModelResult<Self> {
        Self::new(ConnectionConfig::from_env()?)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn backend_type(&self) -> DatabaseBackendType {
        self.backend.backend_type()
    }

    /// Run a result-returning statement
    pub async fn fetch_all(&self, statement: &Statement) -> ModelResult<Vec<Row>> {
        let rows = self
            .round_trip(statement, self.backend.fetch_all(&self.config, statement), |_| None)
            .await?;
        tracing::debug!("Statement returned {} rows", rows.len());
        Ok(rows)
    }

    /// Run a statement that returns no rows
    pub async fn execute(&self, statement: &Statement) -> ModelResult<ExecuteOutcome> {
        let outcome = self
            .round_trip(statement, self.backend.execute(&self.config, statement), |outcome| {
                outcome.last_insert_id
            })
            .await?;
        tracing::debug!(
            "Statement affected {} rows (insert id: {:?})",
            outcome.rows_affected,
            outcome.last_insert_id
        );
        Ok(outcome)
    }

    /// Identifier generated by the most recent statement, if it inserted a row
    pub fn last_insert_id(&self) -> Option<u64> {
        self.last().insert_id
    }

    /// Error text of the most recent statement, if it failed
    pub fn last_error(&self) -> Option<String> {
        self.last().error.clone()
    }

    fn last(&self) -> MutexGuard<'_, LastOutcome> {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn round_trip<T, F>(
        &self,
        statement: &Statement,
        call: F,
        insert_id: impl FnOnce(&T) -> Option<u64>,
    ) -> ModelResult<T>
    where
        F: Future<Output = ModelResult<T>>,
    {
        tracing::debug!(
            "Executing: {} ({} bound parameters)",
            statement.sql(),
            statement.params().len()
        );

        let result = match self.config.timeout {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .unwrap_or(Err(ModelError::Timeout(deadline))),
            None => call.await,
        };

        *self.last() = match &result {
            Ok(value) => LastOutcome {
                insert_id: insert_id(value).filter(|id| *id > 0),
                error: None,
            },
            Err(e) => {
                tracing::error!("Statement failed: {}", e);
                LastOutcome {
                    insert_id: None,
                    error: Some(e.to_string()),
                }
            }
        };

        result
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("backend", &self.backend.backend_type())
            .field("last_insert_id", &self.last_insert_id())
            .field("last_error", &self.last_error())
            .finish()
    }
}

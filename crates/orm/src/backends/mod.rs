//! Database Backend Abstractions
//!
//! Each backend opens one connection per round trip, runs exactly one
//! statement on it and closes it again. MySQL is the production target;
//! SQLite shares the same statement shapes and is used for local work.

pub mod core;
pub mod mysql;
pub mod sqlite;

// Re-export core traits and types
pub use self::core::*;
pub use mysql::MySqlBackend;
pub use sqlite::SqliteBackend;

/// Database backend type enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    #[default]
    MySQL,
    SQLite,
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::MySQL => write!(f, "mysql"),
            DatabaseBackendType::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseBackendType::MySQL),
            "sqlite" => Ok(DatabaseBackendType::SQLite),
            _ => Err(format!("Unsupported database backend: {}", s)),
        }
    }
}

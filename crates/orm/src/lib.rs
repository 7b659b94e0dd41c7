//! # dbmodel: schemaless models over MySQL and SQLite
//!
//! A `Model` is an attribute bag filled from whatever columns a query
//! returns. Finders (`all`, `where_raw`, `find`, `count`, `exists`), mutations
//! (`store`, `update`, `delete`) and relationship traversal (`OneToMany`,
//! `ManyToOne`, `ManyToMany`) each run one statement through a `Database`,
//! which opens a connection for that statement and closes it afterwards.
//!
//! ```no_run
//! use dbmodel::{ConnectionConfig, Database, Model, ModelResult};
//!
//! # async fn run() -> ModelResult<()> {
//! let db = Database::new(ConnectionConfig::new("app").with_username("app"))?;
//! let users = Model::where_raw(&db, "users", "id > 1", "*", "ORDER BY id").await?;
//! for user in &users {
//!     println!("{}", user.to_json());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod collection;
pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod relationships;
pub mod security;
pub mod sql;

#[cfg(test)]
mod tests;

pub use backends::{DatabaseBackend, DatabaseBackendType, DatabaseValue, ExecuteOutcome, Row};
pub use collection::ModelCollection;
pub use config::ConnectionConfig;
pub use database::Database;
pub use error::{ModelError, ModelResult};
pub use model::{Model, DEFAULT_PRIMARY_KEY};
pub use relationships::{ManyToMany, ManyToOne, OneToMany};
pub use sql::{Columns, Condition, Statement};

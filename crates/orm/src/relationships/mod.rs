//! Relationships - traversal between tables by key columns
//!
//! Each descriptor names the related table and the key columns that link it
//! to a model. A descriptor can be followed from one `Model` (one query keyed
//! by `= ?`) or from a whole `ModelCollection` (one query keyed by
//! `IN (...)`). Keys are not enforced by the ORM.

pub mod many_to_many;
pub mod many_to_one;
pub mod one_to_many;

pub use many_to_many::ManyToMany;
pub use many_to_one::ManyToOne;
pub use one_to_many::OneToMany;

use crate::collection::ModelCollection;
use crate::error::ModelResult;
use crate::sql::Condition;

/// `{column} IN (...)` over the distinct values of `key` in `models`.
/// `None` when there is nothing to match.
pub(crate) fn batch_condition(
    models: &ModelCollection,
    key: &str,
    column: &str,
) -> ModelResult<Option<Condition>> {
    let values = models.key_values(key)?;
    if values.is_empty() {
        tracing::debug!(
            "No '{}' values in collection of {}; skipping relationship query",
            key,
            models.len()
        );
        return Ok(None);
    }
    Condition::in_list(column, values).map(Some)
}

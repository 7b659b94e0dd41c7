//! Identifier validation
//!
//! Values are always bound as parameters. Table names and the attribute,
//! key and foreign-key column names the ORM itself writes into a statement
//! are checked here before any connection is opened, and quoted with
//! `escape_identifier` when written. Conditions, column lists and trailing
//! clauses supplied by the caller are trusted SQL text.

use crate::error::ModelError;

/// Characters allowed in SQL identifiers (alphanumeric, underscore, dollar)
const ALLOWED_IDENTIFIER_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_$";

/// MySQL identifier length limit
const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate that a column name is safe to write into SQL
pub fn validate_identifier(identifier: &str) -> Result<(), ModelError> {
    let first = identifier
        .chars()
        .next()
        .ok_or_else(|| ModelError::Validation("Identifier cannot be empty".to_string()))?;

    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' is too long (max {} characters)",
            identifier, MAX_IDENTIFIER_LEN
        )));
    }

    if let Some(c) = identifier.chars().find(|c| !ALLOWED_IDENTIFIER_CHARS.contains(*c)) {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' contains invalid character '{}'",
            identifier, c
        )));
    }

    if first.is_ascii_digit() {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' cannot start with a number",
            identifier
        )));
    }

    Ok(())
}

/// Validate a table name, optionally qualified as `schema.table`
pub fn validate_table_name(table: &str) -> Result<(), ModelError> {
    let mut parts = table.split('.');
    let (first, second, rest) = (parts.next(), parts.next(), parts.next());

    if rest.is_some() {
        return Err(ModelError::Validation(format!(
            "Table name '{}' has too many qualifiers",
            table
        )));
    }

    if let Some(schema) = first.filter(|_| second.is_some()) {
        validate_identifier(schema)?;
    }
    validate_identifier(second.or(first).unwrap_or_default())
}

/// Quote an identifier with backticks, which MySQL and SQLite both accept.
/// Embedded backticks are doubled.
pub fn escape_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Quote every part of a dotted name (`table.column`, `schema.table`)
pub fn escape_identifier_path(path: &str) -> String {
    path.split('.')
        .map(escape_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

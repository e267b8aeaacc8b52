//! # Error Module
//!
//! A single error type for schema validation, row-stream access, value
//! coercion and hydration.

use thiserror::Error;

/// Errors produced by joinery.
#[derive(Debug, Error)]
pub enum Error {
    /// The supplied schema set breaks its input contract
    /// (duplicate names, empty or dangling primary key).
    #[error("invalid schema for table '{table}': {reason}")]
    InvalidSchema { table: String, reason: String },

    /// A table was requested that is not part of the schema set.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// An explicitly chosen relationship does not start at the root table.
    #[error("relationship {from}.{column} does not start at root table '{root}'")]
    RelationshipMismatch { root: String, from: String, column: String },

    /// No candidate field name resolved in the current row.
    #[error("field '{0}' not found in row")]
    FieldNotFound(String),

    /// A non-nullable column resolved to NULL.
    #[error("column '{table}.{column}' is not nullable but the row holds NULL")]
    NullField { table: String, column: String },

    /// A row value could not be coerced into the column's declared type.
    #[error("malformed value in field '{field}' (expected {expected}): {reason}")]
    MalformedValue { field: String, expected: String, reason: String },

    /// The row stream failed to advance or read.
    #[error("row stream error: {0}")]
    Stream(String),

    /// Error returned by the underlying sqlx driver.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// Whether this error only means "the entity is not present in this row".
    ///
    /// Related-entity extraction swallows these to support LEFT JOIN results.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::FieldNotFound(_) | Error::NullField { .. })
    }

    pub(crate) fn malformed(field: &str, expected: impl ToString, reason: impl ToString) -> Self {
        Error::MalformedValue { field: field.to_string(), expected: expected.to_string(), reason: reason.to_string() }
    }
}

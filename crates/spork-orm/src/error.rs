//! Error types for execution and the model layer.

use spork_core::QueryError;
use thiserror::Error;

/// Execution and model errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Query building or compilation error.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row has no such column.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Column value has an incompatible type.
    #[error("cannot decode column `{column}` as {expected}, found {found}")]
    Decode {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Record has no primary key value to address it by.
    #[error("model in `{0}` has no primary key value")]
    MissingPrimaryKey(&'static str),

    /// Soft-delete operation on a schema without a soft-delete column.
    #[error("table `{0}` does not use soft deletes")]
    NotSoftDeleting(&'static str),

    /// Attribute does not exist on the model.
    #[error("unknown attribute `{column}` on `{table}`")]
    UnknownAttribute { table: &'static str, column: String },

    /// The worker pool could not be built.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// A pooled task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;

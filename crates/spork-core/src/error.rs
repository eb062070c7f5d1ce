//! Error types for query building and compilation.

use thiserror::Error;

use crate::event::EventKind;

/// Errors raised while building, staging or compiling a query.
///
/// All of these are raised before any connection is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Operator is not in the accepted whitelist.
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    /// Sort direction is neither `asc` nor `desc`.
    #[error("invalid sort direction: {0}")]
    InvalidDirection(String),

    /// A bulk-insert row has a different number of columns than the first row.
    #[error("inconsistent column count in insert row {row}: expected {expected}, found {found}")]
    InsertRowMismatch {
        /// Index of the offending row.
        row: usize,
        /// Column count of the first row.
        expected: usize,
        /// Column count of the offending row.
        found: usize,
    },

    /// A bulk-insert row lacks a column the first row declares.
    #[error("insert row {row} is missing column `{column}`")]
    InsertColumnMismatch {
        /// Index of the offending row.
        row: usize,
        /// Missing column name.
        column: String,
    },

    /// Insert staged with no rows or no columns.
    #[error("insert requires at least one row with at least one column")]
    EmptyInsert,

    /// Update staged with no assignments.
    #[error("update requires at least one assignment")]
    EmptyAssignment,

    /// Descriptor has no table.
    #[error("query has no table")]
    MissingTable,

    /// A listener tried to cancel an event kind that cannot be canceled.
    #[error("event `{0}` is not cancelable")]
    NotCancelable(EventKind),

    /// Staged values do not fill the compiled placeholders.
    #[error("statement has {placeholders} placeholders but {bindings} bindings")]
    BindingMismatch {
        /// Placeholder count implied by the staged shape.
        placeholders: usize,
        /// Values actually staged.
        bindings: usize,
    },
}

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

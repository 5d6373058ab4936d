//! Type extraction error types.

use thiserror::Error;

/// Errors that can occur when extracting a typed value from a result cell.
#[derive(Debug, Error)]
pub enum TypeError {
    /// Cell is NULL when a non-null value was expected.
    ///
    /// Scan through `Option<T>` to accept NULL cells.
    #[error("unexpected NULL value")]
    UnexpectedNull,

    /// Cell holds a different value kind than the requested type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Requested Rust type.
        expected: &'static str,
        /// Kind of the value actually stored.
        actual: &'static str,
    },

    /// Value does not fit into the requested narrower type.
    #[error("value {value} out of range for {target_type}")]
    OutOfRange {
        /// Requested Rust type.
        target_type: &'static str,
        /// The offending value, rendered for diagnostics.
        value: String,
    },

    /// Requested cell index is beyond the row width.
    #[error("no column at index {index} (row has {width})")]
    MissingColumn {
        /// Requested index.
        index: usize,
        /// Number of cells in the row.
        width: usize,
    },

    /// Requested column name does not exist in the result set.
    #[error("unknown column {name:?}")]
    UnknownColumn {
        /// Requested column name.
        name: String,
    },
}

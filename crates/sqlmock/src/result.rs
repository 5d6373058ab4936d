//! Result summary for `Exec` expectations.

/// Result summary declared for an `Exec` expectation and returned verbatim
/// to the caller when it is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Identifier generated for an inserted row.
    pub last_insert_id: i64,
    /// Number of rows affected by the statement.
    pub rows_affected: u64,
}

impl ExecResult {
    /// Create a new result summary.
    #[must_use]
    pub fn new(last_insert_id: i64, rows_affected: u64) -> Self {
        Self {
            last_insert_id,
            rows_affected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_result_fields() {
        let result = ExecResult::new(1, 3);
        assert_eq!(result.last_insert_id, 1);
        assert_eq!(result.rows_affected, 3);
    }
}

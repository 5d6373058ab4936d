//! Engine error types.
//!
//! Every failure is reported synchronously to the calling operation, exactly
//! once. The variants keep the three failure families apart so a test can
//! tell a protocol violation (illegal in the current connection state) from
//! an unmatched call (legal, but nothing in the queue services it) from a
//! scripted outcome error (the expectation itself declares failure).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// The operation kinds a caller can issue against a mock connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Transaction begin.
    Begin,
    /// Transaction commit.
    Commit,
    /// Transaction rollback.
    Rollback,
    /// Connection (or statement) close.
    Close,
    /// Statement preparation.
    Prepare,
    /// Row-returning query.
    Query,
    /// Row-modifying statement execution.
    Exec,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Begin => "Begin",
            Self::Commit => "Commit",
            Self::Rollback => "Rollback",
            Self::Close => "Close",
            Self::Prepare => "Prepare",
            Self::Query => "Query",
            Self::Exec => "Exec",
        };
        f.write_str(name)
    }
}

/// Shared handle to a caller-declared outcome error.
pub type DeclaredError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by mock operations and the fulfillment audit.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation issued after the connection was closed. Terminal: every
    /// subsequent operation fails the same way regardless of queue content.
    #[error("connection is closed")]
    ConnectionClosed,

    /// Operation illegal in the current connection/transaction state,
    /// independent of the expectation queue.
    #[error("protocol violation: {operation} {reason}")]
    ProtocolViolation {
        /// The offending operation.
        operation: Operation,
        /// Why the operation is illegal right now.
        reason: String,
    },

    /// No expectation in the queue services this call under the active
    /// matching discipline.
    #[error("call to {operation} was not expected{next}")]
    UnexpectedCall {
        /// The unserviced operation.
        operation: Operation,
        /// In ordered mode, `; next expectation is <description>`.
        /// Empty when no pending expectation exists to describe.
        next: String,
    },

    /// Kind and pattern matched an expectation, but the supplied arguments
    /// did not.
    #[error("arguments for {operation} do not match the expectation: {reason}")]
    ArgumentMismatch {
        /// The unserviced operation.
        operation: Operation,
        /// Which positional argument diverged and how.
        reason: String,
    },

    /// A declared query pattern failed to compile as a regular expression.
    #[error("invalid query pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The raw declared pattern.
        pattern: String,
        /// The compile failure.
        source: regex::Error,
    },

    /// The matched expectation declares neither an error nor a result
    /// payload to return.
    #[error("{operation} matched {expectation}, but no rows/result or error was declared for it")]
    MissingOutcome {
        /// The matched operation.
        operation: Operation,
        /// Description of the under-declared expectation.
        expectation: String,
    },

    /// The matched expectation explicitly declares this outcome error; it is
    /// returned verbatim and the expectation counts as fulfilled.
    #[error(transparent)]
    Declared(DeclaredError),

    /// The fulfillment audit found expectations that were never met.
    #[error("{0}")]
    Unfulfilled(UnmetExpectations),
}

impl Error {
    pub(crate) fn unexpected(operation: Operation, next: Option<String>) -> Self {
        let next = match next {
            Some(description) => format!("; next expectation is {description}"),
            None => String::new(),
        };
        Self::UnexpectedCall { operation, next }
    }

    /// Check whether this error reports an operation illegal in the current
    /// connection state (as opposed to an unmatched expectation).
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. } | Self::ConnectionClosed)
    }

    /// Check whether this error reports a call no expectation services.
    ///
    /// Argument mismatches are a sub-case of unexpected calls: the kind and
    /// pattern matched, the argument list did not.
    #[must_use]
    pub fn is_unexpected_call(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedCall { .. } | Self::ArgumentMismatch { .. }
        )
    }

    /// Check whether this error was scripted on the matched expectation.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        matches!(self, Self::Declared(_))
    }
}

/// Audit report enumerating every unmet expectation.
#[derive(Debug, Clone)]
pub struct UnmetExpectations {
    descriptions: Vec<String>,
}

impl UnmetExpectations {
    pub(crate) fn new(descriptions: Vec<String>) -> Self {
        Self { descriptions }
    }

    /// The unmet expectations, described in declaration order.
    #[must_use]
    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }
}

impl fmt::Display for UnmetExpectations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "there {} {} unfulfilled expectation{}:",
            if self.descriptions.len() == 1 { "is" } else { "are" },
            self.descriptions.len(),
            if self.descriptions.len() == 1 { "" } else { "s" },
        )?;
        for description in &self.descriptions {
            write!(f, "\n  - {description}")?;
        }
        Ok(())
    }
}

/// Result type for mock operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_call_message_with_next() {
        let err = Error::unexpected(Operation::Query, Some("Begin".to_string()));
        assert_eq!(
            err.to_string(),
            "call to Query was not expected; next expectation is Begin"
        );
    }

    #[test]
    fn test_unexpected_call_message_without_next() {
        let err = Error::unexpected(Operation::Exec, None);
        assert_eq!(err.to_string(), "call to Exec was not expected");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::ConnectionClosed.is_protocol_violation());
        assert!(
            Error::ProtocolViolation {
                operation: Operation::Commit,
                reason: "no transaction is open".to_string(),
            }
            .is_protocol_violation()
        );
        assert!(Error::unexpected(Operation::Query, None).is_unexpected_call());
        assert!(
            Error::ArgumentMismatch {
                operation: Operation::Exec,
                reason: "expected 1 argument, got 2".to_string(),
            }
            .is_unexpected_call()
        );
        assert!(!Error::ConnectionClosed.is_unexpected_call());
    }

    #[test]
    fn test_declared_error_is_transparent() {
        let declared: DeclaredError = Arc::from(Box::<dyn std::error::Error + Send + Sync>::from(
            "deadlock occurred",
        ));
        let err = Error::Declared(declared);
        assert!(err.is_declared());
        assert_eq!(err.to_string(), "deadlock occurred");
    }

    #[test]
    fn test_unmet_report_lists_every_entry() {
        let report = UnmetExpectations::new(vec!["Begin".to_string(), "Commit".to_string()]);
        let rendered = Error::Unfulfilled(report).to_string();
        assert!(rendered.contains("2 unfulfilled expectations"));
        assert!(rendered.contains("- Begin"));
        assert!(rendered.contains("- Commit"));
    }
}

//! Connection state machine.
//!
//! Tracks whether a transaction is open and which prepared statements exist,
//! and rejects operations illegal in the current state before the
//! expectation queue is ever consulted.
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> InTransaction (via begin)
//! InTransaction -> Ready (via commit or rollback)
//! Ready | InTransaction -> Closed (via close, terminal)
//! ```
//!
//! Prepare is legal from any open state and does not change transaction
//! state; statements are connection-scoped, not transaction-scoped, and
//! remain usable across transaction boundaries until explicitly closed.

use std::collections::HashMap;

use crate::error::{Error, Operation};

/// Runtime session state of a mock connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SessionState {
    /// Connection open, no transaction in progress.
    #[default]
    Ready,
    /// Connection open with an open transaction.
    InTransaction,
    /// Connection closed; every further operation fails.
    Closed,
}

/// Opaque handle identifying a prepared statement.
pub(crate) type StatementId = u64;

/// Per-instance connection state: session phase plus the table of live
/// statement handles, each mapped to the index of its owning `Prepare`
/// expectation in the queue.
#[derive(Debug, Default)]
pub(crate) struct ConnectionState {
    session: SessionState,
    statements: HashMap<StatementId, usize>,
    next_statement_id: StatementId,
}

impl ConnectionState {
    pub(crate) fn session(&self) -> SessionState {
        self.session
    }

    /// Reject an operation illegal in the current state.
    ///
    /// Called before the queue is scanned, so protocol violations are
    /// reported independently of queue content.
    pub(crate) fn check(&self, operation: Operation) -> Result<(), Error> {
        if self.session == SessionState::Closed {
            return Err(Error::ConnectionClosed);
        }
        match operation {
            Operation::Begin if self.session == SessionState::InTransaction => {
                Err(Error::ProtocolViolation {
                    operation,
                    reason: "was called with a transaction already open".to_string(),
                })
            }
            Operation::Commit | Operation::Rollback
                if self.session != SessionState::InTransaction =>
            {
                Err(Error::ProtocolViolation {
                    operation,
                    reason: "was called without an open transaction".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Apply the transition for an operation that was serviced successfully.
    pub(crate) fn apply(&mut self, operation: Operation) {
        match operation {
            Operation::Begin => self.session = SessionState::InTransaction,
            Operation::Commit | Operation::Rollback => self.session = SessionState::Ready,
            Operation::Close => self.session = SessionState::Closed,
            Operation::Prepare | Operation::Query | Operation::Exec => {}
        }
    }

    /// Allocate a statement handle bound to the `Prepare` expectation at
    /// `prepare_index`.
    pub(crate) fn register_statement(&mut self, prepare_index: usize) -> StatementId {
        let id = self.next_statement_id;
        self.next_statement_id += 1;
        self.statements.insert(id, prepare_index);
        id
    }

    /// Look up the owning `Prepare` expectation of a live statement.
    pub(crate) fn statement(&self, operation: Operation, id: StatementId) -> Result<usize, Error> {
        self.statements
            .get(&id)
            .copied()
            .ok_or_else(|| Error::ProtocolViolation {
                operation,
                reason: "was called on a closed statement".to_string(),
            })
    }

    /// Remove a statement handle, returning its owning `Prepare` index.
    pub(crate) fn remove_statement(&mut self, id: StatementId) -> Result<usize, Error> {
        self.statements
            .remove(&id)
            .ok_or_else(|| Error::ProtocolViolation {
                operation: Operation::Close,
                reason: "was called on a statement that is already closed".to_string(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_commit_round_trip() {
        let mut state = ConnectionState::default();
        state.check(Operation::Begin).unwrap();
        state.apply(Operation::Begin);
        assert_eq!(state.session(), SessionState::InTransaction);
        state.check(Operation::Commit).unwrap();
        state.apply(Operation::Commit);
        assert_eq!(state.session(), SessionState::Ready);
    }

    #[test]
    fn test_nested_begin_is_a_violation() {
        let mut state = ConnectionState::default();
        state.apply(Operation::Begin);
        let err = state.check(Operation::Begin).unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_commit_without_transaction_is_a_violation() {
        let state = ConnectionState::default();
        assert!(state.check(Operation::Commit).unwrap_err().is_protocol_violation());
        assert!(
            state
                .check(Operation::Rollback)
                .unwrap_err()
                .is_protocol_violation()
        );
    }

    #[test]
    fn test_closed_connection_rejects_everything() {
        let mut state = ConnectionState::default();
        state.apply(Operation::Close);
        for operation in [
            Operation::Begin,
            Operation::Commit,
            Operation::Rollback,
            Operation::Close,
            Operation::Prepare,
            Operation::Query,
            Operation::Exec,
        ] {
            let err = state.check(operation).unwrap_err();
            assert!(matches!(err, Error::ConnectionClosed));
        }
    }

    #[test]
    fn test_prepare_is_legal_in_any_open_state() {
        let mut state = ConnectionState::default();
        state.check(Operation::Prepare).unwrap();
        state.apply(Operation::Begin);
        state.check(Operation::Prepare).unwrap();
    }

    #[test]
    fn test_statements_survive_transaction_boundaries() {
        let mut state = ConnectionState::default();
        let id = state.register_statement(0);
        state.apply(Operation::Begin);
        assert_eq!(state.statement(Operation::Query, id).unwrap(), 0);
        state.apply(Operation::Commit);
        assert_eq!(state.statement(Operation::Query, id).unwrap(), 0);
    }

    #[test]
    fn test_closed_statement_is_rejected() {
        let mut state = ConnectionState::default();
        let id = state.register_statement(3);
        assert_eq!(state.remove_statement(id).unwrap(), 3);
        assert!(
            state
                .statement(Operation::Exec, id)
                .unwrap_err()
                .is_protocol_violation()
        );
        assert!(state.remove_statement(id).is_err());
    }

    #[test]
    fn test_statement_ids_are_unique() {
        let mut state = ConnectionState::default();
        let a = state.register_statement(0);
        let b = state.register_statement(1);
        assert_ne!(a, b);
    }
}

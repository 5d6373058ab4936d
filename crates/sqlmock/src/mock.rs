//! Mock connection, declaration surface, and statement handles.
//!
//! [`new`] produces a linked [`Connection`]/[`Mock`] pair over one shared
//! expectation queue. The test declares expectations through the [`Mock`],
//! hands the [`Connection`] to the code under test, and finishes with
//! [`Mock::expectations_were_met`].
//!
//! Handles are cheap clones of the shared instance and may be driven from
//! any number of tasks. Matching and claiming run under the instance lock;
//! declared delays run after the claim, outside the lock, so slow
//! expectations never serialize unrelated callers.

use std::sync::Arc;

use parking_lot::Mutex;

use sqlmock_types::SqlValue;

use crate::builders::{
    ExpectedBegin, ExpectedClose, ExpectedCommit, ExpectedExec, ExpectedPrepare, ExpectedQuery,
    ExpectedRollback, Slot,
};
use crate::error::{Error, Operation, Result};
use crate::expectation::{Call, Expectation, ExpectationKind};
use crate::pattern::QueryPattern;
use crate::queue::{Inner, Outcome, Payload};
use crate::result::ExecResult;
use crate::rows::ResultSet;
use crate::state::StatementId;

/// Create a linked mock connection and its declaration handle.
#[must_use]
pub fn new() -> (Connection, Mock) {
    let inner = Arc::new(Mutex::new(Inner::new()));
    (
        Connection {
            inner: Arc::clone(&inner),
        },
        Mock { inner },
    )
}

/// The connection handed to the code under test.
///
/// Every operation consumes one matching expectation and produces its
/// scripted outcome, or fails describing why nothing matched.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<Mutex<Inner>>,
}

/// Apply the claimed outcome: wait out the declared delay, then yield the
/// declared error or payload.
async fn settle(outcome: Outcome) -> Result<Payload> {
    if !outcome.delay.is_zero() {
        tokio::time::sleep(outcome.delay).await;
    }
    match outcome.error {
        Some(error) => Err(Error::Declared(error)),
        None => Ok(outcome.payload),
    }
}

impl Connection {
    /// Open a transaction.
    pub async fn begin(&self) -> Result<()> {
        self.simple(Operation::Begin).await
    }

    /// Commit the open transaction.
    pub async fn commit(&self) -> Result<()> {
        self.simple(Operation::Commit).await
    }

    /// Roll back the open transaction.
    pub async fn rollback(&self) -> Result<()> {
        self.simple(Operation::Rollback).await
    }

    /// Close the connection. Further operations fail with
    /// [`Error::ConnectionClosed`].
    pub async fn close(&self) -> Result<()> {
        self.simple(Operation::Close).await
    }

    async fn simple(&self, operation: Operation) -> Result<()> {
        let outcome = self.inner.lock().resolve(&Call::simple(operation))?;
        settle(outcome).await?;
        Ok(())
    }

    /// Prepare a statement, producing a [`Statement`] handle whose calls
    /// resolve against the matched preparation's scoped expectations.
    pub async fn prepare(&self, query: &str) -> Result<Statement> {
        let call = Call {
            operation: Operation::Prepare,
            query: Some(query),
            args: None,
        };
        let outcome = self.inner.lock().resolve(&call)?;
        let statement = outcome.statement;
        settle(outcome).await?;
        let Some(id) = statement else {
            unreachable!("successful prepare always allocates a statement handle")
        };
        Ok(Statement {
            inner: Arc::clone(&self.inner),
            id,
            query: query.to_string(),
        })
    }

    /// Run a row-returning query.
    pub async fn query(&self, query: &str, args: &[SqlValue]) -> Result<ResultSet> {
        let call = Call {
            operation: Operation::Query,
            query: Some(query),
            args: Some(args),
        };
        let outcome = self.inner.lock().resolve(&call)?;
        match settle(outcome).await? {
            Payload::Rows(rows) => Ok(rows.into_result_set()),
            Payload::None | Payload::Exec(_) => {
                unreachable!("successful query always carries rows")
            }
        }
    }

    /// Run a row-modifying statement.
    pub async fn exec(&self, query: &str, args: &[SqlValue]) -> Result<ExecResult> {
        let call = Call {
            operation: Operation::Exec,
            query: Some(query),
            args: Some(args),
        };
        let outcome = self.inner.lock().resolve(&call)?;
        match settle(outcome).await? {
            Payload::Exec(result) => Ok(result),
            Payload::None | Payload::Rows(_) => {
                unreachable!("successful exec always carries a result summary")
            }
        }
    }
}

/// A prepared statement produced by [`Connection::prepare`].
///
/// Calls on a statement resolve only against the expectations declared
/// under its preparation, never against the top-level queue.
#[derive(Debug, Clone)]
pub struct Statement {
    inner: Arc<Mutex<Inner>>,
    id: StatementId,
    query: String,
}

impl Statement {
    /// The query text this statement was prepared from.
    #[must_use]
    pub fn query_text(&self) -> &str {
        &self.query
    }

    /// Run the prepared statement as a row-returning query.
    pub async fn query(&self, args: &[SqlValue]) -> Result<ResultSet> {
        let call = Call {
            operation: Operation::Query,
            query: Some(&self.query),
            args: Some(args),
        };
        let outcome = self.inner.lock().resolve_statement(self.id, &call)?;
        match settle(outcome).await? {
            Payload::Rows(rows) => Ok(rows.into_result_set()),
            Payload::None | Payload::Exec(_) => {
                unreachable!("successful query always carries rows")
            }
        }
    }

    /// Run the prepared statement as a row-modifying execution.
    pub async fn exec(&self, args: &[SqlValue]) -> Result<ExecResult> {
        let call = Call {
            operation: Operation::Exec,
            query: Some(&self.query),
            args: Some(args),
        };
        let outcome = self.inner.lock().resolve_statement(self.id, &call)?;
        match settle(outcome).await? {
            Payload::Exec(result) => Ok(result),
            Payload::None | Payload::Rows(_) => {
                unreachable!("successful exec always carries a result summary")
            }
        }
    }

    /// Close the statement. Further calls through this handle fail, and a
    /// preparation declared with `will_be_closed` is satisfied.
    pub fn close(&self) -> Result<()> {
        self.inner.lock().close_statement(self.id)
    }
}

/// The declaration and audit surface of one mock instance.
#[derive(Debug, Clone)]
pub struct Mock {
    inner: Arc<Mutex<Inner>>,
}

impl Mock {
    /// Select the matching discipline. `true` (the default) requires calls
    /// in declaration order; `false` lets any pending expectation service a
    /// call, first declared match wins.
    ///
    /// Choose the discipline before driving the connection. Flipping it
    /// after calls were already serviced gives unspecified matching.
    pub fn match_expectations_in_order(&self, ordered: bool) {
        self.inner.lock().ordered = ordered;
    }

    /// Expect a transaction begin.
    pub fn expect_begin(&self) -> ExpectedBegin {
        ExpectedBegin::new(Arc::clone(&self.inner), self.push(ExpectationKind::Begin))
    }

    /// Expect a transaction commit.
    pub fn expect_commit(&self) -> ExpectedCommit {
        ExpectedCommit::new(Arc::clone(&self.inner), self.push(ExpectationKind::Commit))
    }

    /// Expect a transaction rollback.
    pub fn expect_rollback(&self) -> ExpectedRollback {
        ExpectedRollback::new(Arc::clone(&self.inner), self.push(ExpectationKind::Rollback))
    }

    /// Expect the connection to be closed.
    pub fn expect_close(&self) -> ExpectedClose {
        ExpectedClose::new(Arc::clone(&self.inner), self.push(ExpectationKind::Close))
    }

    /// Expect a statement preparation whose query text matches `pattern`.
    ///
    /// The pattern is a regular expression applied to whitespace-normalized
    /// query text.
    pub fn expect_prepare(&self, pattern: &str) -> ExpectedPrepare {
        let kind = ExpectationKind::Prepare {
            pattern: QueryPattern::new(pattern),
            must_close: false,
            closed: false,
            children: Vec::new(),
        };
        ExpectedPrepare::new(Arc::clone(&self.inner), self.push(kind))
    }

    /// Expect a row-returning query whose text matches `pattern`.
    pub fn expect_query(&self, pattern: &str) -> ExpectedQuery {
        let kind = ExpectationKind::Query {
            pattern: Some(QueryPattern::new(pattern)),
            args: None,
            rows: None,
        };
        ExpectedQuery::new(Arc::clone(&self.inner), self.push(kind))
    }

    /// Expect a row-modifying execution whose text matches `pattern`.
    pub fn expect_exec(&self, pattern: &str) -> ExpectedExec {
        let kind = ExpectationKind::Exec {
            pattern: Some(QueryPattern::new(pattern)),
            args: None,
            result: None,
        };
        ExpectedExec::new(Arc::clone(&self.inner), self.push(kind))
    }

    /// Convenience constructor for a declared row set.
    ///
    /// Equivalent to [`Rows::new`]; kept on the mock so a test can declare
    /// everything through one handle.
    #[must_use]
    pub fn new_rows<I, S>(&self, columns: I) -> crate::Rows
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        crate::Rows::new(columns)
    }

    /// Run the fulfillment audit.
    ///
    /// Fails if any non-optional expectation was never matched, or a
    /// preparation declared with `will_be_closed` produced a statement that
    /// was never closed. Callable at any point; a failure enumerates every
    /// unmet entry.
    pub fn expectations_were_met(&self) -> Result<()> {
        self.inner.lock().audit()
    }

    fn push(&self, kind: ExpectationKind) -> Slot {
        let index = self.inner.lock().push(Expectation::new(kind));
        Slot {
            prepare: None,
            index,
        }
    }
}

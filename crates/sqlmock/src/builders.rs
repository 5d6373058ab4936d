//! Declaration handles returned by [`Mock`](crate::Mock) `expect_*` methods.
//!
//! Each handle points at one queued expectation and refines it in place
//! through consuming builder calls. Refinement happens under the instance
//! lock, so expectations may be declared while other tasks are already
//! driving the connection.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::DeclaredError;
use crate::expectation::{Expectation, ExpectationKind};
use crate::matcher::Arg;
use crate::queue::Inner;
use crate::result::ExecResult;
use crate::rows::Rows;

/// Location of one expectation: a top-level queue index, optionally scoped
/// under the `Prepare` entry that owns it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub(crate) prepare: Option<usize>,
    pub(crate) index: usize,
}

macro_rules! simple_handle {
    ($(#[doc = $doc:literal] $handle:ident),* $(,)?) => {$(
        #[doc = $doc]
        #[derive(Debug)]
        pub struct $handle {
            inner: Arc<Mutex<Inner>>,
            slot: Slot,
        }

        impl $handle {
            pub(crate) fn new(inner: Arc<Mutex<Inner>>, slot: Slot) -> Self {
                Self { inner, slot }
            }
        }
    )*};
}

simple_handle! {
    #[doc = "Handle to a declared transaction-begin expectation."]
    ExpectedBegin,
    #[doc = "Handle to a declared transaction-commit expectation."]
    ExpectedCommit,
    #[doc = "Handle to a declared transaction-rollback expectation."]
    ExpectedRollback,
    #[doc = "Handle to a declared connection-close expectation."]
    ExpectedClose,
    #[doc = "Handle to a declared statement-preparation expectation."]
    ExpectedPrepare,
    #[doc = "Handle to a declared row-returning query expectation."]
    ExpectedQuery,
    #[doc = "Handle to a declared row-modifying execution expectation."]
    ExpectedExec,
}

macro_rules! expectation_api {
    ($($handle:ident),* $(,)?) => {$(
        impl $handle {
            /// Script this expectation to fail with `error`.
            ///
            /// The error is returned verbatim to the matching call, which
            /// still fulfills the expectation but leaves connection state
            /// untouched.
            pub fn will_return_error<E>(self, error: E) -> Self
            where
                E: Into<Box<dyn std::error::Error + Send + Sync>>,
            {
                let error: DeclaredError = Arc::from(error.into());
                self.update(move |e| e.error = Some(error));
                self
            }

            /// Delay the scripted outcome by `delay`.
            ///
            /// The delay runs after the expectation is claimed and outside
            /// the instance lock, so a caller-side timeout can fire first
            /// while the expectation still counts as fulfilled. A prepare
            /// abandoned this way never hands out its statement handle, so
            /// a preparation declared with both a delay and
            /// `will_be_closed` cannot audit clean once the caller gives
            /// up on it.
            pub fn will_delay_for(self, delay: Duration) -> Self {
                self.update(move |e| e.delay = delay);
                self
            }

            /// Exempt this expectation from the fulfillment audit.
            ///
            /// In ordered mode an optional entry that does not match a call
            /// is skipped over instead of being treated as the mandatory
            /// head; it stays claimable by a later matching call.
            pub fn optional(self) -> Self {
                self.update(|e| e.optional = true);
                self
            }

            fn update(&self, f: impl FnOnce(&mut Expectation)) {
                let mut inner = self.inner.lock();
                f(inner.expectation_mut(self.slot.prepare, self.slot.index));
            }
        }
    )*};
}

expectation_api! {
    ExpectedBegin,
    ExpectedCommit,
    ExpectedRollback,
    ExpectedClose,
    ExpectedPrepare,
    ExpectedQuery,
    ExpectedExec,
}

impl ExpectedPrepare {
    /// Require the produced statement to be closed before the audit passes.
    pub fn will_be_closed(self) -> Self {
        self.update(|e| {
            if let ExpectationKind::Prepare { must_close, .. } = &mut e.kind {
                *must_close = true;
            }
        });
        self
    }

    /// Declare a query expectation scoped to statements produced from this
    /// preparation.
    ///
    /// The query text was already matched at prepare time, so the child
    /// matches on kind and arguments alone.
    pub fn expect_query(&self) -> ExpectedQuery {
        ExpectedQuery::new(Arc::clone(&self.inner), self.push_child(child_query()))
    }

    /// Declare an execution expectation scoped to statements produced from
    /// this preparation.
    pub fn expect_exec(&self) -> ExpectedExec {
        ExpectedExec::new(Arc::clone(&self.inner), self.push_child(child_exec()))
    }

    fn push_child(&self, child: Expectation) -> Slot {
        let index = self.inner.lock().push_child(self.slot.index, child);
        Slot {
            prepare: Some(self.slot.index),
            index,
        }
    }
}

fn child_query() -> Expectation {
    Expectation::new(ExpectationKind::Query {
        pattern: None,
        args: None,
        rows: None,
    })
}

fn child_exec() -> Expectation {
    Expectation::new(ExpectationKind::Exec {
        pattern: None,
        args: None,
        result: None,
    })
}

impl ExpectedQuery {
    /// Require the call to supply exactly these arguments, position by
    /// position. An empty list requires a call with no arguments.
    pub fn with_args<I>(self, args: I) -> Self
    where
        I: IntoIterator<Item = Arg>,
    {
        let args: Vec<Arg> = args.into_iter().collect();
        self.update(move |e| {
            if let ExpectationKind::Query { args: slot, .. } = &mut e.kind {
                *slot = Some(args);
            }
        });
        self
    }

    /// Script the rows returned to the matching call.
    pub fn will_return_rows(self, rows: Rows) -> Self {
        self.update(move |e| {
            if let ExpectationKind::Query { rows: slot, .. } = &mut e.kind {
                *slot = Some(rows);
            }
        });
        self
    }
}

impl ExpectedExec {
    /// Require the call to supply exactly these arguments, position by
    /// position. An empty list requires a call with no arguments.
    pub fn with_args<I>(self, args: I) -> Self
    where
        I: IntoIterator<Item = Arg>,
    {
        let args: Vec<Arg> = args.into_iter().collect();
        self.update(move |e| {
            if let ExpectationKind::Exec { args: slot, .. } = &mut e.kind {
                *slot = Some(args);
            }
        });
        self
    }

    /// Script the execution summary returned to the matching call.
    pub fn will_return_result(self, result: ExecResult) -> Self {
        self.update(move |e| {
            if let ExpectationKind::Exec { result: slot, .. } = &mut e.kind {
                *slot = Some(result);
            }
        });
        self
    }
}

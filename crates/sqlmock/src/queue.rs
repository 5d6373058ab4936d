//! Expectation queue, scheduler, and fulfillment audit.
//!
//! All queue mutation (scanning for a match, claiming an entry, reading
//! fulfillment state for the audit) happens on [`Inner`] behind the mock
//! instance's single exclusive lock. The lock is held only across the
//! matching and claiming step; a claimed outcome is snapshotted so the
//! declared delay runs after the lock is released and one slow expectation
//! never blocks unrelated concurrent callers.

use std::time::Duration;

use crate::error::{DeclaredError, Error, Operation, UnmetExpectations};
use crate::expectation::{Call, Expectation, ExpectationKind, Verdict};
use crate::result::ExecResult;
use crate::rows::Rows;
use crate::state::{ConnectionState, StatementId};

/// Shared state of one mock instance: discipline flag, expectation queue,
/// and connection state, all guarded by the instance lock.
#[derive(Debug)]
pub(crate) struct Inner {
    /// Active matching discipline. Read per call; flipping it after the
    /// first operation is a caller error with undefined results.
    pub(crate) ordered: bool,
    pub(crate) expectations: Vec<Expectation>,
    pub(crate) state: ConnectionState,
}

/// Snapshot of a claimed expectation's declared outcome, carried out of the
/// critical section.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) delay: Duration,
    pub(crate) error: Option<DeclaredError>,
    pub(crate) payload: Payload,
    /// Handle allocated for a successfully matched `Prepare`.
    pub(crate) statement: Option<StatementId>,
}

#[derive(Debug)]
pub(crate) enum Payload {
    None,
    Rows(Rows),
    Exec(ExecResult),
}

impl Inner {
    pub(crate) fn new() -> Self {
        Self {
            ordered: true,
            expectations: Vec::new(),
            state: ConnectionState::default(),
        }
    }

    /// Append a top-level expectation, returning its stable queue index.
    pub(crate) fn push(&mut self, expectation: Expectation) -> usize {
        self.expectations.push(expectation);
        self.expectations.len() - 1
    }

    /// Append a statement-scoped child to the `Prepare` entry at
    /// `prepare_index`, returning the child's index.
    pub(crate) fn push_child(&mut self, prepare_index: usize, child: Expectation) -> usize {
        let ExpectationKind::Prepare { children, .. } = &mut self.expectations[prepare_index].kind
        else {
            debug_assert!(false, "push_child on a non-Prepare expectation");
            return 0;
        };
        children.push(child);
        children.len() - 1
    }

    pub(crate) fn expectation_mut(
        &mut self,
        prepare_index: Option<usize>,
        index: usize,
    ) -> &mut Expectation {
        match prepare_index {
            None => &mut self.expectations[index],
            Some(prepare) => {
                let ExpectationKind::Prepare { children, .. } =
                    &mut self.expectations[prepare].kind
                else {
                    unreachable!("child slot points at a non-Prepare expectation")
                };
                &mut children[index]
            }
        }
    }

    /// Resolve a connection-level call: legality check, queue scan, claim.
    pub(crate) fn resolve(&mut self, call: &Call<'_>) -> Result<Outcome, Error> {
        self.state.check(call.operation)?;
        let index = find_candidate(&self.expectations, self.ordered, call)?;
        let mut outcome = claim(&mut self.expectations[index], call.operation)?;
        if outcome.error.is_none() {
            if call.operation == Operation::Prepare {
                outcome.statement = Some(self.state.register_statement(index));
            }
            self.state.apply(call.operation);
        }
        tracing::debug!(operation = %call.operation, index, "expectation claimed");
        Ok(outcome)
    }

    /// Resolve a statement-scoped call against the owning `Prepare`'s child
    /// list, under the same discipline as the top-level queue.
    pub(crate) fn resolve_statement(
        &mut self,
        id: StatementId,
        call: &Call<'_>,
    ) -> Result<Outcome, Error> {
        self.state.check(call.operation)?;
        let prepare_index = self.state.statement(call.operation, id)?;
        let ordered = self.ordered;
        let ExpectationKind::Prepare { children, .. } = &mut self.expectations[prepare_index].kind
        else {
            unreachable!("statement handle points at a non-Prepare expectation")
        };
        let index = find_candidate(children, ordered, call)?;
        let outcome = claim(&mut children[index], call.operation)?;
        tracing::debug!(
            operation = %call.operation,
            statement = id,
            index,
            "statement-scoped expectation claimed"
        );
        Ok(outcome)
    }

    /// Close a statement: remove its handle and mark the owning `Prepare`
    /// closed. Not an expectation-consuming call.
    pub(crate) fn close_statement(&mut self, id: StatementId) -> Result<(), Error> {
        self.state.check(Operation::Close)?;
        let prepare_index = self.state.remove_statement(id)?;
        if let ExpectationKind::Prepare { closed, .. } =
            &mut self.expectations[prepare_index].kind
        {
            *closed = true;
        }
        tracing::debug!(statement = id, "statement closed");
        Ok(())
    }

    /// Fulfillment audit: scan every expectation, including statement-scoped
    /// children, under the same lock that guards fulfillment mutation.
    pub(crate) fn audit(&self) -> Result<(), Error> {
        let mut unmet = Vec::new();
        for expectation in &self.expectations {
            collect_unmet(expectation, &mut unmet);
        }
        if unmet.is_empty() {
            Ok(())
        } else {
            tracing::debug!(count = unmet.len(), "audit found unfulfilled expectations");
            Err(Error::Unfulfilled(UnmetExpectations::new(unmet)))
        }
    }
}

/// Find the queue index of the expectation that services `call`.
///
/// Ordered: the first not-yet-fulfilled non-optional entry is the head and
/// must match outright; later entries are never considered, so gaps in the
/// declared order are detected. A non-matching `optional` entry is skipped
/// over rather than treated as the head, and stays claimable by a later
/// matching call.
///
/// Unordered: declaration-order scan for the first unfulfilled full match,
/// skipping non-matching entries. A candidate that matched kind and pattern
/// but not arguments is remembered so the failure reads as an argument
/// mismatch rather than a missing expectation. An entry whose declared
/// pattern failed to compile is deferred; its compile error is surfaced
/// only when no other entry services the call.
fn find_candidate(
    expectations: &[Expectation],
    ordered: bool,
    call: &Call<'_>,
) -> Result<usize, Error> {
    if ordered {
        for (index, expectation) in expectations.iter().enumerate() {
            if expectation.fulfilled {
                continue;
            }
            match expectation.matches(call)? {
                Verdict::Match => return Ok(index),
                _ if expectation.optional => continue,
                Verdict::ArgumentMismatch(reason) => {
                    return Err(Error::ArgumentMismatch {
                        operation: call.operation,
                        reason,
                    });
                }
                Verdict::KindMismatch | Verdict::PatternMismatch => {
                    return Err(Error::unexpected(
                        call.operation,
                        Some(expectation.describe()),
                    ));
                }
            }
        }
        return Err(Error::unexpected(call.operation, None));
    }

    let mut near_miss: Option<String> = None;
    let mut broken: Option<Error> = None;
    for (index, expectation) in expectations.iter().enumerate() {
        if expectation.fulfilled {
            continue;
        }
        match expectation.matches(call) {
            Ok(Verdict::Match) => return Ok(index),
            Ok(Verdict::ArgumentMismatch(reason)) => {
                near_miss.get_or_insert(reason);
            }
            Ok(Verdict::KindMismatch | Verdict::PatternMismatch) => {}
            Err(error) => {
                broken.get_or_insert(error);
            }
        }
    }
    if let Some(reason) = near_miss {
        return Err(Error::ArgumentMismatch {
            operation: call.operation,
            reason,
        });
    }
    if let Some(error) = broken {
        return Err(error);
    }
    Err(Error::unexpected(call.operation, None))
}

/// Mark a matched expectation fulfilled and snapshot its declared outcome.
///
/// A `Query`/`Exec` entry that declares neither an error nor a payload is
/// rejected without being claimed, so the audit still reports it.
fn claim(expectation: &mut Expectation, operation: Operation) -> Result<Outcome, Error> {
    let payload = match &expectation.kind {
        ExpectationKind::Query { rows, .. } => match rows {
            Some(rows) => Payload::Rows(rows.clone()),
            None if expectation.error.is_none() => {
                return Err(Error::MissingOutcome {
                    operation,
                    expectation: expectation.describe(),
                });
            }
            None => Payload::None,
        },
        ExpectationKind::Exec { result, .. } => match result {
            Some(result) => Payload::Exec(*result),
            None if expectation.error.is_none() => {
                return Err(Error::MissingOutcome {
                    operation,
                    expectation: expectation.describe(),
                });
            }
            None => Payload::None,
        },
        _ => Payload::None,
    };
    debug_assert!(!expectation.fulfilled, "expectation claimed twice");
    expectation.fulfilled = true;
    Ok(Outcome {
        delay: expectation.delay,
        error: expectation.error.clone(),
        payload,
        statement: None,
    })
}

fn collect_unmet(expectation: &Expectation, unmet: &mut Vec<String>) {
    if !expectation.optional && !expectation.fulfilled {
        unmet.push(expectation.describe());
    }
    if let ExpectationKind::Prepare {
        must_close,
        closed,
        children,
        ..
    } = &expectation.kind
    {
        if expectation.fulfilled && *must_close && !*closed {
            unmet.push(format!(
                "{} (statement was never closed)",
                expectation.describe()
            ));
        }
        for child in children {
            collect_unmet(child, unmet);
        }
    }
}

//! Expectation records.
//!
//! One record per anticipated operation, tagged by kind with kind-specific
//! payloads. `Prepare` owns its statement-scoped child expectations
//! explicitly; statement handles returned to the caller are opaque indices
//! into that relationship.

use std::time::Duration;

use sqlmock_types::SqlValue;

use crate::error::{DeclaredError, Error, Operation};
use crate::matcher::Arg;
use crate::pattern::QueryPattern;
use crate::result::ExecResult;
use crate::rows::Rows;

/// A declared anticipated operation plus its scripted outcome.
#[derive(Debug)]
pub(crate) struct Expectation {
    pub(crate) kind: ExpectationKind,
    /// Scripted outcome error, returned verbatim to the caller.
    pub(crate) error: Option<DeclaredError>,
    /// Delay applied before the outcome is released, outside the lock.
    pub(crate) delay: Duration,
    /// Set exactly once, under the instance lock, when a call claims this
    /// entry.
    pub(crate) fulfilled: bool,
    /// Optional entries never fail the audit.
    pub(crate) optional: bool,
}

/// Kind discriminator plus kind-specific payload.
#[derive(Debug)]
pub(crate) enum ExpectationKind {
    Begin,
    Commit,
    Rollback,
    Close,
    Prepare {
        pattern: QueryPattern,
        /// Audit fails unless the produced statement is closed.
        must_close: bool,
        closed: bool,
        /// Statement-scoped child expectations, matched only by calls on
        /// statements produced from this entry.
        children: Vec<Expectation>,
    },
    Query {
        /// Absent pattern matches any query text.
        pattern: Option<QueryPattern>,
        /// Absent list skips argument checking entirely; an empty list
        /// requires zero arguments.
        args: Option<Vec<Arg>>,
        rows: Option<Rows>,
    },
    Exec {
        pattern: Option<QueryPattern>,
        args: Option<Vec<Arg>>,
        result: Option<ExecResult>,
    },
}

/// An incoming driver call, as seen by the scheduler.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Call<'a> {
    pub(crate) operation: Operation,
    pub(crate) query: Option<&'a str>,
    pub(crate) args: Option<&'a [SqlValue]>,
}

impl<'a> Call<'a> {
    pub(crate) fn simple(operation: Operation) -> Self {
        Self {
            operation,
            query: None,
            args: None,
        }
    }
}

/// Why a candidate did or did not service a call.
#[derive(Debug)]
pub(crate) enum Verdict {
    Match,
    KindMismatch,
    PatternMismatch,
    ArgumentMismatch(String),
}

impl Expectation {
    pub(crate) fn new(kind: ExpectationKind) -> Self {
        Self {
            kind,
            error: None,
            delay: Duration::ZERO,
            fulfilled: false,
            optional: false,
        }
    }

    /// The operation kind this expectation anticipates.
    pub(crate) fn operation(&self) -> Operation {
        match self.kind {
            ExpectationKind::Begin => Operation::Begin,
            ExpectationKind::Commit => Operation::Commit,
            ExpectationKind::Rollback => Operation::Rollback,
            ExpectationKind::Close => Operation::Close,
            ExpectationKind::Prepare { .. } => Operation::Prepare,
            ExpectationKind::Query { .. } => Operation::Query,
            ExpectationKind::Exec { .. } => Operation::Exec,
        }
    }

    /// Match this candidate against an incoming call.
    ///
    /// Kind, then pattern, then arguments; the verdict keeps the failing
    /// step distinct so diagnostics can tell an argument mismatch from a
    /// pattern mismatch. `Err` is reserved for unusable declarations
    /// (invalid pattern).
    pub(crate) fn matches(&self, call: &Call<'_>) -> Result<Verdict, Error> {
        if self.operation() != call.operation {
            return Ok(Verdict::KindMismatch);
        }
        let pattern = match &self.kind {
            ExpectationKind::Prepare { pattern, .. } => Some(pattern),
            ExpectationKind::Query { pattern, .. } | ExpectationKind::Exec { pattern, .. } => {
                pattern.as_ref()
            }
            _ => None,
        };
        if let (Some(pattern), Some(query)) = (pattern, call.query) {
            if !pattern.matches(query)? {
                return Ok(Verdict::PatternMismatch);
            }
        }
        let declared_args = match &self.kind {
            ExpectationKind::Query { args, .. } | ExpectationKind::Exec { args, .. } => {
                args.as_ref()
            }
            _ => None,
        };
        if let Some(declared) = declared_args {
            let supplied = call.args.unwrap_or(&[]);
            if declared.len() != supplied.len() {
                return Ok(Verdict::ArgumentMismatch(format!(
                    "expected {} argument{}, got {}",
                    declared.len(),
                    if declared.len() == 1 { "" } else { "s" },
                    supplied.len(),
                )));
            }
            for (index, (matcher, value)) in declared.iter().zip(supplied).enumerate() {
                if !matcher.matches(value) {
                    return Ok(Verdict::ArgumentMismatch(format!(
                        "argument {index} {value:?} does not satisfy {matcher:?}"
                    )));
                }
            }
        }
        Ok(Verdict::Match)
    }

    /// Render this entry for unexpected-call and audit diagnostics.
    pub(crate) fn describe(&self) -> String {
        let mut out = self.operation().to_string();
        let pattern = match &self.kind {
            ExpectationKind::Prepare { pattern, .. } => Some(pattern),
            ExpectationKind::Query { pattern, .. } | ExpectationKind::Exec { pattern, .. } => {
                pattern.as_ref()
            }
            _ => None,
        };
        if let Some(pattern) = pattern {
            out.push_str(&format!(" matching {:?}", pattern.raw()));
        }
        if let ExpectationKind::Query { args: Some(args), .. }
        | ExpectationKind::Exec { args: Some(args), .. } = &self.kind
        {
            out.push_str(&format!(" with args {args:?}"));
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::args;
    use crate::matcher::Arg;

    fn query_expectation(pattern: Option<&str>, args: Option<Vec<Arg>>) -> Expectation {
        Expectation::new(ExpectationKind::Query {
            pattern: pattern.map(QueryPattern::new),
            args,
            rows: Some(Rows::new(["id"])),
        })
    }

    #[test]
    fn test_kind_must_be_identical() {
        let expectation = Expectation::new(ExpectationKind::Begin);
        let verdict = expectation
            .matches(&Call::simple(Operation::Commit))
            .unwrap();
        assert!(matches!(verdict, Verdict::KindMismatch));
    }

    #[test]
    fn test_absent_pattern_matches_any_text() {
        let expectation = query_expectation(None, None);
        let call = Call {
            operation: Operation::Query,
            query: Some("SELECT anything"),
            args: Some(&[]),
        };
        assert!(matches!(expectation.matches(&call).unwrap(), Verdict::Match));
    }

    #[test]
    fn test_pattern_mismatch_is_distinct_from_argument_mismatch() {
        let expectation = query_expectation(Some("SELECT .+ FROM articles"), Some(args![5]));
        let wrong_text = Call {
            operation: Operation::Query,
            query: Some("SELECT 1 FROM authors"),
            args: Some(&[SqlValue::Int(5)]),
        };
        assert!(matches!(
            expectation.matches(&wrong_text).unwrap(),
            Verdict::PatternMismatch
        ));

        let wrong_args = Call {
            operation: Operation::Query,
            query: Some("SELECT id FROM articles"),
            args: Some(&[SqlValue::Int(6)]),
        };
        assert!(matches!(
            expectation.matches(&wrong_args).unwrap(),
            Verdict::ArgumentMismatch(_)
        ));
    }

    #[test]
    fn test_absent_args_skip_checking_but_empty_list_requires_none() {
        let unchecked = query_expectation(None, None);
        let call = Call {
            operation: Operation::Query,
            query: Some("SELECT 1"),
            args: Some(&[SqlValue::Int(1), SqlValue::Int(2)]),
        };
        assert!(matches!(unchecked.matches(&call).unwrap(), Verdict::Match));

        let empty = query_expectation(None, Some(Vec::new()));
        assert!(matches!(
            empty.matches(&call).unwrap(),
            Verdict::ArgumentMismatch(_)
        ));
    }

    #[test]
    fn test_describe_includes_pattern_and_args() {
        let expectation = query_expectation(Some("SELECT (.+)"), Some(args![5, "x"]));
        let description = expectation.describe();
        assert!(description.starts_with("Query"));
        assert!(description.contains("SELECT (.+)"));
        assert!(description.contains("with args"));
    }
}

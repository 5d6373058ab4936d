//! Query pattern matching.
//!
//! Query text is never parsed or executed; it is matched as an opaque string
//! against a declared case-sensitive regular expression, after collapsing
//! whitespace runs so multi-line SQL in the caller lines up with single-line
//! patterns.

use regex::Regex;

use crate::error::Error;

/// A declared query pattern.
///
/// The pattern is compiled eagerly at declaration; a compile failure is
/// retained and surfaced as [`Error::InvalidPattern`] on the first match
/// attempt, so the chainable declaration surface stays infallible.
#[derive(Debug, Clone)]
pub(crate) struct QueryPattern {
    raw: String,
    compiled: Result<Regex, regex::Error>,
}

impl QueryPattern {
    pub(crate) fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let compiled = Regex::new(&raw);
        Self { raw, compiled }
    }

    pub(crate) fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the normalized query text satisfies the pattern.
    pub(crate) fn matches(&self, query: &str) -> Result<bool, Error> {
        match &self.compiled {
            Ok(regex) => Ok(regex.is_match(&normalize(query))),
            Err(source) => Err(Error::InvalidPattern {
                pattern: self.raw.clone(),
                source: source.clone(),
            }),
        }
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub(crate) fn normalize(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Argument matching.
//!
//! Expectations store matchers, not raw values, so comparison logic is
//! uniform: the default is type-aware equality, with regex and custom
//! predicates as drop-in replacements for a position.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use sqlmock_types::SqlValue;

use crate::error::Error;

/// Custom predicate over one supplied argument value.
///
/// Implemented for any `Fn(&SqlValue) -> bool`, so closures work directly
/// with [`Arg::custom`].
pub trait ArgMatcher: Send + Sync {
    /// Whether the supplied value satisfies this matcher.
    fn matches(&self, value: &SqlValue) -> bool;
}

impl<F> ArgMatcher for F
where
    F: Fn(&SqlValue) -> bool + Send + Sync,
{
    fn matches(&self, value: &SqlValue) -> bool {
        self(value)
    }
}

/// One declared positional argument of a `Query`/`Exec` expectation.
#[derive(Clone)]
pub enum Arg {
    /// Type-aware equality against a concrete value (the default).
    Value(SqlValue),
    /// Matches any supplied value.
    Any,
    /// Regular expression over string arguments; non-string values never
    /// match.
    Regex(Regex),
    /// Custom predicate, fully overriding default equality for this
    /// position.
    Custom(Arc<dyn ArgMatcher>),
}

impl Arg {
    /// An argument matcher that accepts any value.
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    /// An argument matcher applying `pattern` to string arguments.
    pub fn regex(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|source| Error::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// An argument matcher backed by a custom predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&SqlValue) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    pub(crate) fn matches(&self, value: &SqlValue) -> bool {
        match self {
            Self::Value(expected) => values_equal(expected, value),
            Self::Any => true,
            Self::Regex(regex) => value.as_str().is_some_and(|s| regex.is_match(s)),
            Self::Custom(matcher) => matcher.matches(value),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value:?}"),
            Self::Any => f.write_str("<any>"),
            Self::Regex(regex) => write!(f, "~/{}/", regex.as_str()),
            Self::Custom(_) => f.write_str("<custom>"),
        }
    }
}

macro_rules! arg_from {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for Arg {
            fn from(value: $ty) -> Self {
                Self::Value(SqlValue::from(value))
            }
        }
    )*};
}

arg_from!(bool, u8, i16, i32, i64, f32, f64, &str, String, Vec<u8>, SqlValue);

/// Default type-aware equality.
///
/// Identical value kinds compare directly. Numeric values of different
/// widths compare through a common representation (`i64` for integers, `f64`
/// across the integer/float boundary) and the match fails when the
/// conversion would lose precision.
pub(crate) fn values_equal(expected: &SqlValue, actual: &SqlValue) -> bool {
    if expected == actual {
        return true;
    }
    match (expected.as_i64(), actual.as_i64()) {
        (Some(a), Some(b)) => return a == b,
        (Some(i), None) => {
            if let Some(f) = actual.as_f64() {
                return int_float_eq(i, f);
            }
        }
        (None, Some(i)) => {
            if let Some(f) = expected.as_f64() {
                return int_float_eq(i, f);
            }
        }
        (None, None) => {
            if let (Some(a), Some(b)) = (expected.as_f64(), actual.as_f64()) {
                return a == b;
            }
        }
    }
    false
}

/// Integer/float equality, exact only when the float is an integral value
/// inside the i64 range and converts back to the same integer.
///
/// The bounds check comes first: a float-to-int `as` cast saturates, so an
/// out-of-range float would otherwise round-trip "successfully" to i64::MAX
/// and defeat the losslessness requirement.
#[allow(clippy::cast_possible_truncation)]
fn int_float_eq(i: i64, f: f64) -> bool {
    const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if f.fract() != 0.0 || f < -I64_LIMIT || f >= I64_LIMIT {
        return false;
    }
    f as i64 == i
}

/// Build an argument-matcher list from a mixed list of values and matchers.
///
/// ```
/// use sqlmock::{Arg, args};
///
/// let declared = args![5, "hello world", Arg::any()];
/// assert_eq!(declared.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::Arg::from($arg)),*]
    };
}

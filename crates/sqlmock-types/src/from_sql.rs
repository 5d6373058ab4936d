//! Trait for extracting Rust values from result cells.

use bytes::Bytes;

use crate::error::TypeError;
use crate::value::SqlValue;

/// Trait for types that can be extracted from a [`SqlValue`].
///
/// Implemented for common Rust types so rows declared against a mock can be
/// scanned back with the same types the production code would use. Narrowing
/// integer conversions are range-checked; mock rows are frequently declared
/// with the widest integer type and scanned into something smaller.
pub trait FromSql: Sized {
    /// Extract this type from a SQL value.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Extract from a possibly-NULL SQL value.
    ///
    /// Returns `None` if the cell is NULL.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

fn mismatch<T>(expected: &'static str, value: &SqlValue) -> Result<T, TypeError> {
    match value {
        SqlValue::Null => Err(TypeError::UnexpectedNull),
        other => Err(TypeError::TypeMismatch {
            expected,
            actual: other.type_name(),
        }),
    }
}

fn narrow<T: TryFrom<i64>>(target: &'static str, wide: i64) -> Result<T, TypeError> {
    T::try_from(wide).map_err(|_| TypeError::OutOfRange {
        target_type: target,
        value: wide.to_string(),
    })
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            other => mismatch("bool", other),
        }
    }
}

impl FromSql for u8 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value.as_i64() {
            Some(wide) => narrow("u8", wide),
            None => mismatch("u8", value),
        }
    }
}

impl FromSql for i16 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value.as_i64() {
            Some(wide) => narrow("i16", wide),
            None => mismatch("i16", value),
        }
    }
}

impl FromSql for i32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value.as_i64() {
            Some(wide) => narrow("i32", wide),
            None => mismatch("i32", value),
        }
    }
}

impl FromSql for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value.as_i64() {
            Some(wide) => Ok(wide),
            None => mismatch("i64", value),
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            other => mismatch("f32", other),
        }
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value.as_f64() {
            Some(v) => Ok(v),
            None => mismatch("f64", value),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::String(v) => Ok(v.clone()),
            other => mismatch("String", other),
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Binary(v) => Ok(v.to_vec()),
            other => mismatch("Vec<u8>", other),
        }
    }
}

impl FromSql for Bytes {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Binary(v) => Ok(v.clone()),
            other => mismatch("Bytes", other),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

#[cfg(feature = "decimal")]
impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Decimal(v) => Ok(*v),
            other => mismatch("Decimal", other),
        }
    }
}

#[cfg(feature = "uuid")]
impl FromSql for uuid::Uuid {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Uuid(v) => Ok(*v),
            other => mismatch("Uuid", other),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDate {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Date(v) => Ok(*v),
            other => mismatch("NaiveDate", other),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Time(v) => Ok(*v),
            other => mismatch("NaiveTime", other),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::DateTime(v) => Ok(*v),
            other => mismatch("NaiveDateTime", other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_null_to_option() {
        let scanned: Option<i32> = Option::<i32>::from_sql(&SqlValue::Null).unwrap();
        assert!(scanned.is_none());
    }

    #[test]
    fn test_value_to_option() {
        let scanned: Option<i32> = Option::<i32>::from_sql(&SqlValue::Int(42)).unwrap();
        assert_eq!(scanned, Some(42));
    }

    #[test]
    fn test_null_to_plain_type_fails() {
        let err = i32::from_sql(&SqlValue::Null).unwrap_err();
        assert!(matches!(err, TypeError::UnexpectedNull));
    }

    #[test]
    fn test_narrowing_in_range() {
        assert_eq!(i32::from_sql(&SqlValue::BigInt(7)).unwrap(), 7);
        assert_eq!(u8::from_sql(&SqlValue::Int(255)).unwrap(), 255);
    }

    #[test]
    fn test_narrowing_out_of_range() {
        let err = u8::from_sql(&SqlValue::Int(256)).unwrap_err();
        assert!(matches!(err, TypeError::OutOfRange { .. }));
        let err = i32::from_sql(&SqlValue::BigInt(i64::MAX)).unwrap_err();
        assert!(matches!(err, TypeError::OutOfRange { .. }));
    }

    #[test]
    fn test_string_round_trip() {
        let value = SqlValue::from("hello world");
        assert_eq!(String::from_sql(&value).unwrap(), "hello world");
    }

    #[test]
    fn test_type_mismatch_reports_kinds() {
        let err = String::from_sql(&SqlValue::Int(1)).unwrap_err();
        match err {
            TypeError::TypeMismatch { expected, actual } => {
                assert_eq!(expected, "String");
                assert_eq!(actual, "i32");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    proptest! {
        #[test]
        fn prop_i64_round_trips(v in any::<i64>()) {
            let value = SqlValue::from(v);
            prop_assert_eq!(i64::from_sql(&value).unwrap(), v);
        }

        #[test]
        fn prop_narrowing_matches_try_from(v in any::<i64>()) {
            let value = SqlValue::from(v);
            match (i32::from_sql(&value), i32::try_from(v)) {
                (Ok(narrowed), Ok(expected)) => prop_assert_eq!(narrowed, expected),
                (Err(TypeError::OutOfRange { .. }), Err(_)) => {}
                (got, want) => prop_assert!(false, "mismatch: {:?} vs {:?}", got, want.is_ok()),
            }
        }
    }
}

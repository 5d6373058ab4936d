//! SQL value representation.

use bytes::Bytes;

/// A SQL value as exchanged between a client and a mocked database.
///
/// `Null` doubles as the explicit "no value" marker for declared result
/// rows: scanning it through `Option<T>` yields `None`, while any present
/// value (including an empty string) scans as `Some`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 8-bit unsigned integer.
    TinyInt(u8),
    /// 16-bit signed integer.
    SmallInt(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// String value.
    String(String),
    /// Binary value.
    Binary(Bytes),
    /// Decimal value.
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// UUID value.
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    /// Date value.
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// Time value.
    #[cfg(feature = "chrono")]
    Time(chrono::NaiveTime),
    /// DateTime value.
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Widen any integer value to an i64.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::TinyInt(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Widen any floating point value to an f64.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Name of the stored value kind, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "bool",
            Self::TinyInt(_) => "u8",
            Self::SmallInt(_) => "i16",
            Self::Int(_) => "i32",
            Self::BigInt(_) => "i64",
            Self::Float(_) => "f32",
            Self::Double(_) => "f64",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            #[cfg(feature = "decimal")]
            Self::Decimal(_) => "decimal",
            #[cfg(feature = "uuid")]
            Self::Uuid(_) => "uuid",
            #[cfg(feature = "chrono")]
            Self::Date(_) => "date",
            #[cfg(feature = "chrono")]
            Self::Time(_) => "time",
            #[cfg(feature = "chrono")]
            Self::DateTime(_) => "datetime",
        }
    }
}

impl Default for SqlValue {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u8> for SqlValue {
    fn from(v: u8) -> Self {
        Self::TinyInt(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        Self::SmallInt(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

impl From<Bytes> for SqlValue {
    fn from(v: Bytes) -> Self {
        Self::Binary(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

#[cfg(feature = "decimal")]
impl From<rust_decimal::Decimal> for SqlValue {
    fn from(v: rust_decimal::Decimal) -> Self {
        Self::Decimal(v)
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for SqlValue {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDate> for SqlValue {
    fn from(v: chrono::NaiveDate) -> Self {
        Self::Date(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveTime> for SqlValue {
    fn from(v: chrono::NaiveTime) -> Self {
        Self::Time(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDateTime> for SqlValue {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

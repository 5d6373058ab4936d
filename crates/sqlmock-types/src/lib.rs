//! # sqlmock-types
//!
//! Value representation shared between the sqlmock engine and test code.
//!
//! A mocked query or statement carries its arguments and result cells as
//! [`SqlValue`], a tagged union over the value kinds a generic SQL client
//! exchanges with a database. [`FromSql`] extracts typed Rust values from
//! result cells, with `Option<T>` mapping SQL NULL to `None`.
//!
//! ## Features
//!
//! - `chrono` (default): date/time value support via chrono
//! - `uuid` (default): UUID value support
//! - `decimal` (default): decimal value support via rust_decimal

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod from_sql;
pub mod value;

pub use error::TypeError;
pub use from_sql::FromSql;
pub use value::SqlValue;

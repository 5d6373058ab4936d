//! Programmable mock for SQL connections.
//!
//! A test declares the exact sequence (or set) of database operations it
//! anticipates, each with a scripted outcome, hands the mock connection to
//! the code under test, and afterwards audits that every expectation was
//! met. No real database is involved; query text is matched as an opaque
//! string against declared regular expressions.
//!
//! # Example
//!
//! ```
//! use sqlmock::{args, values, ExecResult, Rows};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (conn, mock) = sqlmock::new();
//!
//! mock.expect_begin();
//! mock.expect_query("SELECT (.+) FROM articles WHERE id = \\?")
//!     .with_args(args![5])
//!     .will_return_rows(Rows::new(["id", "title"]).add_row(values![5, "hello world"]));
//! mock.expect_exec("UPDATE articles")
//!     .will_return_result(ExecResult::new(0, 1));
//! mock.expect_commit();
//!
//! // Code under test drives the connection.
//! conn.begin().await?;
//! let mut rows = conn
//!     .query("SELECT id, title FROM articles WHERE id = ?", &values![5])
//!     .await?;
//! let row = rows.next().ok_or("no row")?;
//! assert_eq!(row.get::<String>(1)?, "hello world");
//! conn.exec("UPDATE articles SET read = 1 WHERE id = 5", &[]).await?;
//! conn.commit().await?;
//!
//! mock.expectations_were_met()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Matching disciplines
//!
//! By default calls must arrive in declaration order. With
//! [`Mock::match_expectations_in_order`]`(false)` any pending expectation
//! may service a call, which suits code issuing operations from concurrent
//! tasks.
//!
//! # Feature flags
//!
//! - `chrono` (default): date/time cell values.
//! - `uuid` (default): UUID cell values.
//! - `decimal` (default): fixed-point decimal cell values.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod builders;
mod error;
mod expectation;
mod matcher;
mod mock;
mod pattern;
mod queue;
mod result;
mod rows;
mod state;

pub use builders::{
    ExpectedBegin, ExpectedClose, ExpectedCommit, ExpectedExec, ExpectedPrepare, ExpectedQuery,
    ExpectedRollback,
};
pub use error::{DeclaredError, Error, Operation, Result, UnmetExpectations};
pub use matcher::{Arg, ArgMatcher};
pub use mock::{new, Connection, Mock, Statement};
pub use result::ExecResult;
pub use rows::{ResultSet, Row, Rows};

pub use sqlmock_types::{FromSql, SqlValue, TypeError};

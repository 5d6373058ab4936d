//! Declared row sets and the cursor returned by matched queries.
//!
//! A [`Rows`] value is built by the test author, attached to a `Query`
//! expectation, and immutable from then on. When the expectation is matched
//! the caller receives a [`ResultSet`] cursor over a copy of the declared
//! rows.

use std::sync::Arc;

use sqlmock_types::{FromSql, SqlValue, TypeError};

/// Declared result rows for a `Query` expectation.
///
/// Each row is an ordered list of [`SqlValue`] cells, one per column.
/// `SqlValue::Null` declares an absent value: scanning it through
/// `Option<T>` yields `None`.
#[derive(Debug, Clone)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl Rows {
    /// Create an empty row set with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append one row. The row width must equal the column count.
    #[must_use]
    pub fn add_row(mut self, values: Vec<SqlValue>) -> Self {
        assert_eq!(
            values.len(),
            self.columns.len(),
            "row width must match the declared column count"
        );
        self.rows.push(values);
        self
    }

    /// Bulk-load rows from comma-separated literal text, one row per line.
    ///
    /// Integer and float tokens become numeric values, the literal token
    /// `NULL` becomes a null cell, and everything else passes through as a
    /// string. There is no implicit null and no quoting; use [`Rows::add_row`]
    /// for values containing commas.
    #[must_use]
    pub fn from_csv(mut self, csv: &str) -> Self {
        for line in csv.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let values: Vec<SqlValue> = line.split(',').map(parse_csv_token).collect();
            self = self.add_row(values);
        }
        self
    }

    /// Declared column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of declared rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn into_result_set(self) -> ResultSet {
        ResultSet {
            columns: Arc::from(self.columns),
            rows: self.rows.into_iter(),
        }
    }
}

fn parse_csv_token(token: &str) -> SqlValue {
    let token = token.trim();
    if token == "NULL" {
        return SqlValue::Null;
    }
    if let Ok(v) = token.parse::<i64>() {
        return SqlValue::BigInt(v);
    }
    if let Ok(v) = token.parse::<f64>() {
        return SqlValue::Double(v);
    }
    SqlValue::String(token.to_string())
}

/// Cursor over the rows produced by a matched query.
///
/// Iterates the declared rows in declaration order, then reports
/// end-of-data.
#[derive(Debug)]
pub struct ResultSet {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
}

impl ResultSet {
    /// Column names of this result set.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Iterator for ResultSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next().map(|values| Row {
            columns: Arc::clone(&self.columns),
            values,
        })
    }
}

/// One row produced by a matched query.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Extract the value at `index` as `T`.
    ///
    /// Scan through `Option<T>` to accept NULL cells.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        match self.values.get(index) {
            Some(value) => T::from_sql(value),
            None => Err(TypeError::MissingColumn {
                index,
                width: self.values.len(),
            }),
        }
    }

    /// Extract the value of the named column as `T`.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        match self.columns.iter().position(|c| c == name) {
            Some(index) => self.get(index),
            None => Err(TypeError::UnknownColumn {
                name: name.to_string(),
            }),
        }
    }

    /// Raw cell values of this row.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Number of cells in this row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build a row cell list from a mixed list of literal values.
///
/// ```
/// use sqlmock::{Rows, values};
///
/// let rows = Rows::new(["id", "title", "note"])
///     .add_row(values![1, "first", None::<&str>]);
/// assert_eq!(rows.len(), 1);
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::SqlValue::from($value)),*]
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::values;

    #[test]
    fn test_round_trip_single_row() {
        let mut cursor = Rows::new(["id", "title"])
            .add_row(values![5, "hello world"])
            .into_result_set();

        let row = cursor.next().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 5);
        assert_eq!(row.get::<String>(1).unwrap(), "hello world");
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_empty_row_set_yields_no_rows() {
        let mut cursor = Rows::new(["id"]).into_result_set();
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_csv_parses_typed_values() {
        let mut cursor = Rows::new(["id", "title"])
            .from_csv("5,hello world")
            .into_result_set();

        let row = cursor.next().unwrap();
        assert_eq!(row.values()[0], SqlValue::BigInt(5));
        assert_eq!(row.values()[1], SqlValue::String("hello world".to_string()));
    }

    #[test]
    fn test_csv_multiple_lines_and_null_token() {
        let rows = Rows::new(["id", "score", "note"]).from_csv("1,2.5,first\n2,NULL,second\n");
        assert_eq!(rows.len(), 2);

        let mut cursor = rows.into_result_set();
        let first = cursor.next().unwrap();
        assert_eq!(first.values()[1], SqlValue::Double(2.5));
        let second = cursor.next().unwrap();
        assert!(second.values()[1].is_null());
        assert_eq!(second.get::<Option<f64>>(1).unwrap(), None);
    }

    #[test]
    fn test_nullable_scan_round_trip() {
        let mut cursor = Rows::new(["id", "active", "created", "status"])
            .add_row(values![1, true, "2024-01-01", 5])
            .add_row(values![2, false, None::<&str>, None::<i64>])
            .into_result_set();

        let present = cursor.next().unwrap();
        assert_eq!(
            present.get::<Option<String>>(2).unwrap(),
            Some("2024-01-01".to_string())
        );
        assert_eq!(present.get::<Option<i64>>(3).unwrap(), Some(5));

        let absent = cursor.next().unwrap();
        assert_eq!(absent.get::<i64>(0).unwrap(), 2);
        assert!(!absent.get::<bool>(1).unwrap());
        assert_eq!(absent.get::<Option<String>>(2).unwrap(), None);
        assert_eq!(absent.get::<Option<i64>>(3).unwrap(), None);
    }

    #[test]
    fn test_get_by_name() {
        let mut cursor = Rows::new(["id", "title"])
            .add_row(values![7, "x"])
            .into_result_set();
        let row = cursor.next().unwrap();
        assert_eq!(row.get_by_name::<i64>("id").unwrap(), 7);
        assert!(matches!(
            row.get_by_name::<i64>("missing").unwrap_err(),
            TypeError::UnknownColumn { .. }
        ));
    }

    #[test]
    fn test_out_of_bounds_index() {
        let mut cursor = Rows::new(["id"]).add_row(values![1]).into_result_set();
        let row = cursor.next().unwrap();
        assert!(matches!(
            row.get::<i64>(5).unwrap_err(),
            TypeError::MissingColumn { .. }
        ));
    }
}

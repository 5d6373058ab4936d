//! Prepared statement lifecycle tests.
//!
//! Statement-scoped expectations are declared under their preparation and
//! matched only by calls on statements produced from it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use sqlmock::{args, values, Error, ExecResult, Rows};

#[tokio::test]
async fn test_statement_calls_resolve_against_their_preparation() {
    let (conn, mock) = sqlmock::new();
    let prepare = mock.expect_prepare("SELECT (.+) FROM articles WHERE id = \\?");
    prepare
        .expect_query()
        .with_args(args![5])
        .will_return_rows(Rows::new(["id", "title"]).add_row(values![5, "hello"]));

    let stmt = conn
        .prepare("SELECT id, title FROM articles WHERE id = ?")
        .await
        .unwrap();
    let mut rows = stmt.query(&values![5]).await.unwrap();
    let row = rows.next().unwrap();
    assert_eq!(row.get::<i64>(0).unwrap(), 5);
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_statement_exec_child() {
    let (conn, mock) = sqlmock::new();
    let prepare = mock.expect_prepare("INSERT INTO articles");
    prepare
        .expect_exec()
        .with_args(args!["hello"])
        .will_return_result(ExecResult::new(7, 1));

    let stmt = conn
        .prepare("INSERT INTO articles (title) VALUES (?)")
        .await
        .unwrap();
    let result = stmt.exec(&values!["hello"]).await.unwrap();
    assert_eq!(result.last_insert_id, 7);
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_top_level_expectations_do_not_leak_into_statements() {
    let (conn, mock) = sqlmock::new();
    mock.expect_prepare("SELECT");
    mock.expect_query("SELECT")
        .will_return_rows(Rows::new(["id"]).add_row(values![1]));

    let stmt = conn.prepare("SELECT id FROM t").await.unwrap();
    // The top-level query expectation is not visible to the statement.
    let err = stmt.query(&[]).await.unwrap_err();
    assert!(err.is_unexpected_call());

    // It still services a direct connection-level query.
    conn.query("SELECT id FROM t", &[]).await.unwrap();
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_statement_children_follow_the_ordered_discipline() {
    let (conn, mock) = sqlmock::new();
    let prepare = mock.expect_prepare("UPDATE");
    prepare
        .expect_exec()
        .with_args(args![1])
        .will_return_result(ExecResult::new(0, 1));
    prepare
        .expect_exec()
        .with_args(args![2])
        .will_return_result(ExecResult::new(0, 1));

    let stmt = conn.prepare("UPDATE t SET a = ?").await.unwrap();
    let err = stmt.exec(&values![2]).await.unwrap_err();
    assert!(err.is_unexpected_call());

    stmt.exec(&values![1]).await.unwrap();
    stmt.exec(&values![2]).await.unwrap();
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_will_be_closed_gates_the_audit() {
    let (conn, mock) = sqlmock::new();
    let prepare = mock.expect_prepare("SELECT").will_be_closed();
    prepare
        .expect_query()
        .will_return_rows(Rows::new(["id"]).add_row(values![1]));

    let stmt = conn.prepare("SELECT id FROM t").await.unwrap();
    stmt.query(&[]).await.unwrap();

    // Matched and queried, but never closed.
    let err = mock.expectations_were_met().unwrap_err();
    assert!(err.to_string().contains("never closed"));

    stmt.close().unwrap();
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_calls_on_a_closed_statement_fail() {
    let (conn, mock) = sqlmock::new();
    mock.expect_prepare("SELECT");

    let stmt = conn.prepare("SELECT id FROM t").await.unwrap();
    stmt.close().unwrap();

    let err = stmt.query(&[]).await.unwrap_err();
    assert!(err.is_protocol_violation());
    let err = stmt.close().unwrap_err();
    assert!(err.is_protocol_violation());
}

#[tokio::test]
async fn test_unmatched_statement_children_fail_the_audit() {
    let (conn, mock) = sqlmock::new();
    let prepare = mock.expect_prepare("SELECT");
    prepare
        .expect_query()
        .will_return_rows(Rows::new(["id"]).add_row(values![1]));

    let _stmt = conn.prepare("SELECT id FROM t").await.unwrap();

    let err = mock.expectations_were_met().unwrap_err();
    let Error::Unfulfilled(report) = err else {
        panic!("expected an audit failure");
    };
    assert_eq!(report.descriptions().len(), 1);
    assert!(report.descriptions()[0].contains("Query"));
}

#[tokio::test]
async fn test_declared_prepare_error_produces_no_statement() {
    let (conn, mock) = sqlmock::new();
    mock.expect_prepare("SELECT").will_return_error("syntax error");

    let err = conn.prepare("SELECT id FROM t").await.unwrap_err();
    assert!(err.is_declared());
    mock.expectations_were_met().unwrap();
}

#[tokio::test]
async fn test_prepare_pattern_mismatch() {
    let (conn, mock) = sqlmock::new();
    mock.expect_prepare("^INSERT");

    let err = conn.prepare("SELECT id FROM t").await.unwrap_err();
    assert!(err.is_unexpected_call());
}

#[tokio::test]
async fn test_statements_survive_transaction_boundaries() {
    let (conn, mock) = sqlmock::new();
    let prepare = mock.expect_prepare("UPDATE");
    mock.expect_begin();
    prepare
        .expect_exec()
        .will_return_result(ExecResult::new(0, 1));
    mock.expect_commit();
    prepare
        .expect_exec()
        .will_return_result(ExecResult::new(0, 1));

    let stmt = conn.prepare("UPDATE t SET a = 1").await.unwrap();
    conn.begin().await.unwrap();
    stmt.exec(&[]).await.unwrap();
    conn.commit().await.unwrap();
    // Still usable after the transaction closed.
    stmt.exec(&[]).await.unwrap();
    mock.expectations_were_met().unwrap();
}

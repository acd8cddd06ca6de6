//! Integration tests for the commit run.
//!
//! Tests verify that:
//! - Batch mode executes the statement once per row and commits once
//! - Single mode executes the statement verbatim
//! - A failing row rolls the whole batch back
//! - Row values are bound, never spliced into the SQL text

use db_query_export::console::Console;
use db_query_export::db::{Connector, QueryExecutor};
use db_query_export::error::ErrorKind;
use db_query_export::input;
use db_query_export::models::{CommitMode, CommitRow, ConnectionConfig, QueryParam};
use db_query_export::tools::CommitHandler;
use serde_json::{Value as JsonValue, json};
use std::io::Write;
use tempfile::TempDir;

async fn setup_db(dir: &TempDir) -> ConnectionConfig {
    let path = dir.path().join("commit.db");
    let config = ConnectionConfig::sqlite(path.to_string_lossy());
    CommitHandler::new(Console::quiet())
        .run(
            &config,
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            &[],
        )
        .await
        .unwrap();
    config
}

async fn query_rows(config: &ConnectionConfig, sql: &str) -> Vec<Vec<JsonValue>> {
    let connector = Connector::new(Console::quiet());
    let mut conn = connector.try_connect(config).await.unwrap();
    let result = QueryExecutor::new(Console::quiet())
        .query(&mut conn, sql)
        .await
        .unwrap();
    connector.close(conn).await;
    result.rows
}

async fn count_people(config: &ConnectionConfig) -> JsonValue {
    query_rows(config, "SELECT COUNT(*) FROM people").await[0][0].clone()
}

fn person(id: i64, name: &str) -> CommitRow {
    vec![QueryParam::Int(id), QueryParam::from(name)]
}

#[tokio::test]
async fn test_batch_executes_once_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;

    let rows = vec![person(1, "Ada"), person(2, "Grace"), person(3, "Edsger")];
    let summary = CommitHandler::new(Console::quiet())
        .run(&config, "INSERT INTO people (id, name) VALUES ({}, '{}')", &rows)
        .await
        .unwrap();

    assert_eq!(summary.mode, CommitMode::Batch);
    assert_eq!(summary.statements_executed, 3);
    assert_eq!(summary.rows_affected, 3);
    assert_eq!(summary.message(), "Committed 3 rows.");
    assert_eq!(count_people(&config).await, json!(3));
}

#[tokio::test]
async fn test_single_row_uses_singular_message() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;

    let summary = CommitHandler::new(Console::quiet())
        .run(&config, "INSERT INTO people (id, name) VALUES (?, ?)", &[person(7, "Barbara")])
        .await
        .unwrap();

    assert_eq!(summary.statements_executed, 1);
    assert_eq!(summary.message(), "Committed 1 row.");
    assert_eq!(
        query_rows(&config, "SELECT id, name FROM people").await,
        vec![vec![json!(7), json!("Barbara")]]
    );
}

#[tokio::test]
async fn test_no_rows_runs_statement_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;

    let summary = CommitHandler::new(Console::quiet())
        .run(&config, "INSERT INTO people (id, name) VALUES (1, 'Only')", &[])
        .await
        .unwrap();

    assert_eq!(summary.mode, CommitMode::Single);
    assert_eq!(summary.statements_executed, 1);
    assert_eq!(summary.message(), "Commit.");
    assert_eq!(count_people(&config).await, json!(1));
}

#[tokio::test]
async fn test_failing_row_rolls_back_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;

    // second row violates the primary key of the first
    let rows = vec![person(1, "Ada"), person(1, "Duplicate"), person(2, "Grace")];
    let err = CommitHandler::new(Console::quiet())
        .run(&config, "INSERT INTO people (id, name) VALUES ({}, {})", &rows)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(count_people(&config).await, json!(0));
}

#[tokio::test]
async fn test_quoted_values_are_stored_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;

    let tricky = "O'Brien'); DROP TABLE people; --";
    CommitHandler::new(Console::quiet())
        .run(
            &config,
            "INSERT INTO people (id, name) VALUES ({0}, '{1}')",
            &[person(1, tricky)],
        )
        .await
        .unwrap();

    assert_eq!(
        query_rows(&config, "SELECT name FROM people WHERE id = 1").await,
        vec![vec![json!(tricky)]]
    );
}

#[tokio::test]
async fn test_short_row_is_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;

    let rows = vec![person(1, "Ada"), vec![QueryParam::Int(2)]];
    let err = CommitHandler::new(Console::quiet())
        .run(&config, "INSERT INTO people (id, name) VALUES ({}, {})", &rows)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(count_people(&config).await, json!(0));
}

#[tokio::test]
async fn test_update_from_csv_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;
    CommitHandler::new(Console::quiet())
        .run(
            &config,
            "INSERT INTO people (id, name) VALUES (?, ?)",
            &[person(1, "old"), person(2, "old")],
        )
        .await
        .unwrap();

    let data = dir.path().join("renames.csv");
    let mut file = std::fs::File::create(&data).unwrap();
    file.write_all(b"name,id\n\"Lovelace, Ada\",1\nHopper,2\n").unwrap();
    drop(file);

    let rows = input::load_rows(&data, true).unwrap();
    let summary = CommitHandler::new(Console::quiet())
        .run(&config, "UPDATE people SET name = '{0}' WHERE id = {1}", &rows)
        .await
        .unwrap();

    assert_eq!(summary.message(), "Committed 2 rows.");
    assert_eq!(
        query_rows(&config, "SELECT name FROM people ORDER BY id").await,
        vec![vec![json!("Lovelace, Ada")], vec![json!("Hopper")]]
    );
}

#[tokio::test]
async fn test_slot_inside_like_pattern_matches_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;
    CommitHandler::new(Console::quiet())
        .run(
            &config,
            "INSERT INTO people (id, name) VALUES (?, ?)",
            &[person(1, "Ada Lovelace"), person(2, "Grace Hopper")],
        )
        .await
        .unwrap();

    let summary = CommitHandler::new(Console::quiet())
        .run(
            &config,
            "UPDATE people SET name = 'matched' WHERE name LIKE '%{}%'",
            &[vec![QueryParam::from("Ada")]],
        )
        .await
        .unwrap();

    assert_eq!(summary.rows_affected, 1);
    assert_eq!(
        query_rows(&config, "SELECT name FROM people ORDER BY id").await,
        vec![vec![json!("matched")], vec![json!("Grace Hopper")]]
    );
}

#[tokio::test]
async fn test_slot_inside_literal_stores_row_value() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_db(&dir).await;

    let rows = vec![
        vec![QueryParam::Int(7), QueryParam::from("7")],
        vec![QueryParam::Int(8), QueryParam::from("it's 8")],
    ];
    CommitHandler::new(Console::quiet())
        .run(&config, "INSERT INTO people (id, name) VALUES ({}, 'id-{}')", &rows)
        .await
        .unwrap();

    assert_eq!(
        query_rows(&config, "SELECT name FROM people ORDER BY id").await,
        vec![vec![json!("id-7")], vec![json!("id-it's 8")]]
    );
}

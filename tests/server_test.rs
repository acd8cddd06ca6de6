//! Export and commit against live PostgreSQL / MySQL servers.
//!
//! Set `TEST_POSTGRES_URL` and/or `TEST_MYSQL_URL` to a connection descriptor
//! (`user/password@host:port/database`) to run these; otherwise they are skipped.

use db_query_export::console::Console;
use db_query_export::input;
use db_query_export::models::{ConnectionConfig, ConnectionDescriptor, DatabaseType, QueryParam, QuerySpec};
use db_query_export::tools::format::UTF8_BOM;
use db_query_export::tools::{CommitHandler, ExportHandler};

fn server_config(var: &str, db_type: DatabaseType) -> Option<ConnectionConfig> {
    let Ok(text) = std::env::var(var) else {
        eprintln!("Skipping: {} not set", var);
        return None;
    };
    let descriptor: ConnectionDescriptor = text.parse().expect("valid descriptor");
    Some(ConnectionConfig::new(db_type, descriptor))
}

/// Export one query and return the file body after the BOM.
async fn export_one(config: &ConnectionConfig, sql: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    ExportHandler::new(Console::quiet(), dir.path())
        .run(config, &[QuerySpec::new(sql, "Typed")])
        .await
        .unwrap();
    let bytes = std::fs::read(dir.path().join("1. Typed.csv")).unwrap();
    String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap()
}

/// Commit the rows of a CSV data file through a format-style template.
async fn commit_csv(config: &ConnectionConfig, template: &str, csv: &str) -> u64 {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.csv");
    std::fs::write(&path, csv).unwrap();
    let rows = input::load_rows(&path, true).unwrap();
    CommitHandler::new(Console::quiet())
        .run(config, template, &rows)
        .await
        .unwrap()
        .rows_affected
}

async fn round_trip(config: ConnectionConfig, table: &str) {
    let commit = CommitHandler::new(Console::quiet());
    commit
        .run(&config, &format!("DROP TABLE IF EXISTS {table}"), &[])
        .await
        .unwrap();
    commit
        .run(
            &config,
            &format!("CREATE TABLE {table} (id BIGINT PRIMARY KEY, name VARCHAR(100))"),
            &[],
        )
        .await
        .unwrap();

    let rows = vec![
        vec![QueryParam::Int(1), QueryParam::from("O'Brien")],
        vec![QueryParam::Int(2), QueryParam::Null],
    ];
    let summary = commit
        .run(&config, &format!("INSERT INTO {table} (id, name) VALUES ({{}}, '{{}}')"), &rows)
        .await
        .unwrap();
    assert_eq!(summary.message(), "Committed 2 rows.");

    let dir = tempfile::tempdir().unwrap();
    let export = ExportHandler::new(Console::quiet(), dir.path());
    export
        .run(
            &config,
            &[QuerySpec::new(
                format!("SELECT id, name FROM {table} ORDER BY id"),
                "Server  round trip",
            )],
        )
        .await
        .unwrap();

    let bytes = std::fs::read(dir.path().join("1. Server round trip.csv")).unwrap();
    let content = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
    assert!(content.ends_with("id,name\r\n1,O'Brien\r\n2,\r\n"), "{content:?}");

    commit
        .run(&config, &format!("DROP TABLE {table}"), &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_round_trip() {
    if let Some(config) = server_config("TEST_POSTGRES_URL", DatabaseType::PostgreSQL) {
        round_trip(config, "db_query_export_test").await;
    }
}

#[tokio::test]
async fn test_mysql_round_trip() {
    if let Some(config) = server_config("TEST_MYSQL_URL", DatabaseType::MySQL) {
        round_trip(config, "db_query_export_test").await;
    }
}

#[tokio::test]
async fn test_postgres_typed_columns_from_csv() {
    let Some(config) = server_config("TEST_POSTGRES_URL", DatabaseType::PostgreSQL) else {
        return;
    };
    let table = "db_query_export_typed";
    let commit = CommitHandler::new(Console::quiet());
    commit
        .run(&config, &format!("DROP TABLE IF EXISTS {table}"), &[])
        .await
        .unwrap();
    commit
        .run(
            &config,
            &format!(
                "CREATE TABLE {table} (id INTEGER PRIMARY KEY, key UUID, born DATE, \
                 seen TIMESTAMP, amount NUMERIC(10,2), doc JSONB, raw BYTEA, tag TEXT)"
            ),
            &[],
        )
        .await
        .unwrap();

    // every CSV cell is text; empty cells in typed columns become NULL
    let affected = commit_csv(
        &config,
        &format!(
            "INSERT INTO {table} (id, key, born, seen, amount, doc, raw, tag) \
             VALUES ({{}}, '{{}}', '{{}}', '{{}}', {{}}, '{{}}', '{{}}', 'tag-{{}}')"
        ),
        "id,key,born,seen,amount,doc,raw,tag\n\
         1,6f1c0a3e-8d2b-4c55-9a4e-2f0b1c3d4e5f,1990-05-17,2024-01-02 03:04:05,1234.50,\"{\"\"k\"\": 1}\",\\x4869,plain\n\
         2,,,,,,,\n",
    )
    .await;
    assert_eq!(affected, 2);

    let content = export_one(
        &config,
        &format!("SELECT id, key, born, seen, amount, doc, raw, tag FROM {table} ORDER BY id"),
    )
    .await;
    assert!(
        content.ends_with(
            "id,key,born,seen,amount,doc,raw,tag\r\n\
             1,6f1c0a3e-8d2b-4c55-9a4e-2f0b1c3d4e5f,1990-05-17,2024-01-02 03:04:05,1234.50,\"{\"\"k\"\":1}\",Hi,tag-plain\r\n\
             2,,,,,,,tag-\r\n"
        ),
        "{content:?}"
    );

    // a LIKE pattern around a slot matches on the server too
    let affected = commit_csv(
        &config,
        &format!("UPDATE {table} SET tag = 'hit' WHERE tag LIKE '%{{}}%'"),
        "needle\nplai\n",
    )
    .await;
    assert_eq!(affected, 1);

    commit
        .run(&config, &format!("DROP TABLE {table}"), &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_server_only_types_are_never_blank() {
    let Some(config) = server_config("TEST_POSTGRES_URL", DatabaseType::PostgreSQL) else {
        return;
    };
    let content = export_one(
        &config,
        "SELECT interval '1 day' AS i, '10.0.0.1'::inet AS ip, ARRAY[1, 2] AS a, \
         '12:00+02'::timetz AS tz, 1.5::money AS m, ARRAY['x', NULL] AS t",
    )
    .await;
    assert!(
        content.ends_with("i,ip,a,tz,m,t\r\n1 day,10.0.0.1,\"[1,2]\",12:00:00+02:00,1.50,\"[\"\"x\"\",null]\"\r\n"),
        "{content:?}"
    );

    let content = export_one(&config, "SELECT gen_random_uuid() AS u").await;
    let cell = content.lines().last().unwrap();
    assert_eq!(cell.len(), 36, "{content:?}");
}

#[tokio::test]
async fn test_mysql_typed_columns_from_csv() {
    let Some(config) = server_config("TEST_MYSQL_URL", DatabaseType::MySQL) else {
        return;
    };
    let table = "db_query_export_typed";
    let commit = CommitHandler::new(Console::quiet());
    commit
        .run(&config, &format!("DROP TABLE IF EXISTS {table}"), &[])
        .await
        .unwrap();
    commit
        .run(
            &config,
            &format!(
                "CREATE TABLE {table} (id INT PRIMARY KEY, born DATE, seen DATETIME, \
                 amount DECIMAL(10,2), doc JSON, raw BLOB, tag VARCHAR(50))"
            ),
            &[],
        )
        .await
        .unwrap();

    let affected = commit_csv(
        &config,
        &format!(
            "INSERT INTO {table} (id, born, seen, amount, doc, raw, tag) \
             VALUES ({{}}, '{{}}', '{{}}', {{}}, '{{}}', '{{}}', 'tag-{{}}')"
        ),
        "id,born,seen,amount,doc,raw,tag\n\
         1,1990-05-17,2024-01-02 03:04:05,1234.50,\"{\"\"k\"\": 1}\",Hi,plain\n",
    )
    .await;
    assert_eq!(affected, 1);

    let content = export_one(
        &config,
        &format!("SELECT id, born, seen, amount, doc, raw, tag FROM {table} ORDER BY id"),
    )
    .await;
    assert!(
        content.ends_with(
            "id,born,seen,amount,doc,raw,tag\r\n\
             1,1990-05-17,2024-01-02 03:04:05,1234.50,\"{\"\"k\"\":1}\",Hi,tag-plain\r\n"
        ),
        "{content:?}"
    );

    commit
        .run(&config, &format!("DROP TABLE {table}"), &[])
        .await
        .unwrap();
}

//! Query and commit execution.
//!
//! This module provides the two statement-running operations of the exporter:
//! - `query`: run one statement and materialize its column names and all rows
//! - `commit`: run a statement once per data row (or once verbatim) inside a
//!   single transaction and commit it once
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific query and commit operations
//! - `postgres`: PostgreSQL-specific query and commit operations
//! - `sqlite`: SQLite-specific query and commit operations
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::console::Console;
use crate::db::connection::DbConnection;
use crate::db::template::StatementTemplate;
use crate::db::types::RowToValues;
use crate::error::{DbError, DbResult};
use crate::models::{CommitMode, CommitRow, CommitSummary, QueryResult};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info};

/// What a commit call has to execute.
enum CommitWork<'a> {
    Single(&'a str),
    Batch {
        template: &'a StatementTemplate,
        rows: &'a [CommitRow],
    },
}

/// Query executor that handles statement execution on an open connection.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    /// `None` waits for the database as long as it takes
    statement_timeout: Option<Duration>,
    decode_binary: bool,
    console: Console,
}

impl QueryExecutor {
    /// Create a new executor without a timeout, decoding UTF-8 binary values as text.
    pub fn new(console: Console) -> Self {
        Self {
            statement_timeout: None,
            decode_binary: true,
            console,
        }
    }

    /// Bound every statement by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Write binary columns as base64 even when they hold valid UTF-8.
    pub fn with_decode_binary(mut self, decode_binary: bool) -> Self {
        self.decode_binary = decode_binary;
        self
    }

    /// Execute `sql` as-is and return its column names and every row.
    ///
    /// Column names come from the prepared statement, so a query that matches no
    /// rows still reports its header.
    pub async fn query(&self, conn: &mut DbConnection, sql: &str) -> DbResult<QueryResult> {
        let start = Instant::now();
        let limit = self.statement_timeout;
        let decode_binary = self.decode_binary;

        self.console.blank();
        self.console.progress("Opening cursor");
        info!("Opening cursor");

        self.console.progress("Running query...");
        self.console.blank();
        self.console.progress(sql);
        info!("Running query...");
        info!(sql = %sql, "Query text");

        let (columns, rows) = impl_db_dispatch!(conn, {
            MySql(c) => {
                let (columns, rows) = run_bounded(limit, "query execution", mysql::fetch(c, sql)).await?;
                (columns, process_rows(&rows, decode_binary))
            },
            Postgres(c) => {
                let (columns, rows) = run_bounded(limit, "query execution", postgres::fetch(c, sql)).await?;
                (columns, process_rows(&rows, decode_binary))
            },
            SQLite(c) => {
                let (columns, rows) = run_bounded(limit, "query execution", sqlite::fetch(c, sql)).await?;
                (columns, process_rows(&rows, decode_binary))
            },
        });

        let execution_time_ms = start.elapsed().as_millis() as u64;
        self.console.blank();
        self.console
            .progress(format!("Cursor closed. Retrieved {} rows.", rows.len()));
        self.console.blank();
        info!(
            rows = rows.len(),
            columns = columns.len(),
            execution_time_ms = execution_time_ms,
            "Cursor closed. Retrieved {} rows.",
            rows.len()
        );

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    /// Execute `template` once per row in `rows`, or once verbatim when `rows` is
    /// empty, then commit exactly once.
    ///
    /// Row values are bound as parameters. Every row is checked against the
    /// template before anything runs; a failing statement rolls the whole call back.
    pub async fn commit(
        &self,
        conn: &mut DbConnection,
        template: &str,
        rows: &[CommitRow],
    ) -> DbResult<CommitSummary> {
        let start = Instant::now();
        let limit = self.statement_timeout;

        self.console.blank();
        self.console.progress("Opening cursor");
        info!("Opening cursor");
        self.console.progress("Updating database...");
        info!("Updating database...");

        let parsed;
        let (mode, work) = if rows.is_empty() {
            self.console.blank();
            self.console.progress(template);
            info!(sql = %template, "Statement text");
            (CommitMode::Single, CommitWork::Single(template))
        } else {
            parsed = StatementTemplate::parse(template, conn.db_type())?;
            for row in rows {
                parsed.arguments(row)?;
            }
            debug!(
                sql = %parsed.sql(),
                native_placeholders = parsed.is_native(),
                rows = rows.len(),
                "Prepared batch statement"
            );
            (
                CommitMode::Batch,
                CommitWork::Batch {
                    template: &parsed,
                    rows,
                },
            )
        };

        let progress = self.progress_bar(rows.len());
        let on_row = |index: usize| {
            info!(row = index + 1, total = rows.len(), "Executed statement");
            progress.inc(1);
        };

        let result = impl_db_dispatch!(conn, {
            MySql(c) => mysql::commit(c, &work, limit, &on_row).await,
            Postgres(c) => postgres::commit(c, &work, limit, &on_row).await,
            SQLite(c) => sqlite::commit(c, &work, limit, &on_row).await,
        });

        let (statements_executed, rows_affected) = match result {
            Ok(counts) => {
                progress.finish_and_clear();
                counts
            }
            Err(e) => {
                progress.abandon();
                error!(error = %e, "Commit failed, transaction rolled back");
                return Err(e);
            }
        };

        let summary = CommitSummary {
            mode,
            statements_executed,
            rows_affected,
            execution_time_ms: start.elapsed().as_millis() as u64,
        };

        self.console.blank();
        self.console.progress(summary.message());
        info!(
            statements = summary.statements_executed,
            rows_affected = summary.rows_affected,
            "{}",
            summary.message()
        );

        self.console.progress("Cursor closed.");
        self.console.blank();
        info!("Cursor closed");

        Ok(summary)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if len == 0 || !self.console.is_verbose() {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} rows {elapsed}") {
            bar.set_style(style);
        }
        bar
    }
}

/// Convert rows from any database type into ordered cell values.
fn process_rows<R: RowToValues>(rows: &[R], decode_binary: bool) -> Vec<Vec<JsonValue>> {
    rows.iter().map(|r| r.to_values(decode_binary)).collect()
}

// =============================================================================
// Common Helper Functions
// =============================================================================

/// Await a driver future, bounded by `limit` when one is configured.
async fn run_bounded<T, F>(limit: Option<Duration>, operation: &str, fut: F) -> DbResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match limit {
        Some(limit) => match timeout(limit, fut).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(timeout_error(operation, limit)),
        },
        None => fut.await.map_err(DbError::from),
    }
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs())
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Column, Connection, Executor, MySqlConnection, Statement};

    pub async fn fetch(
        conn: &mut MySqlConnection,
        sql: &str,
    ) -> Result<(Vec<String>, Vec<MySqlRow>), sqlx::Error> {
        let statement = (&mut *conn).prepare(sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = statement.query().fetch_all(&mut *conn).await?;
        Ok((columns, rows))
    }

    pub(super) async fn commit(
        conn: &mut MySqlConnection,
        work: &CommitWork<'_>,
        limit: Option<Duration>,
        on_row: &dyn Fn(usize),
    ) -> DbResult<(usize, u64)> {
        let mut tx = conn.begin().await?;
        let mut executed = 0;
        let mut affected = 0;

        match work {
            CommitWork::Single(sql) => {
                let result = run_bounded(limit, "commit statement", (&mut *tx).execute(*sql)).await?;
                executed += 1;
                affected += result.rows_affected();
            }
            CommitWork::Batch { template, rows } => {
                for (index, row) in rows.iter().enumerate() {
                    let mut query = sqlx::query(template.sql());
                    for param in template.arguments(row)? {
                        query = bind_mysql_param(query, param);
                    }
                    let result = run_bounded(limit, "commit statement", query.execute(&mut *tx)).await?;
                    executed += 1;
                    affected += result.rows_affected();
                    on_row(index);
                }
            }
        }

        run_bounded(limit, "commit", tx.commit()).await?;
        Ok((executed, affected))
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use crate::models::QueryParam;
    use sqlx::postgres::{PgRow, PgTypeInfo};
    use sqlx::{Column, Connection, Either, Executor, PgConnection, Statement, TypeInfo};

    static NULL: QueryParam = QueryParam::Null;

    pub async fn fetch(
        conn: &mut PgConnection,
        sql: &str,
    ) -> Result<(Vec<String>, Vec<PgRow>), sqlx::Error> {
        let statement = (&mut *conn).prepare(sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = statement.query().fetch_all(&mut *conn).await?;
        Ok((columns, rows))
    }

    pub(super) async fn commit(
        conn: &mut PgConnection,
        work: &CommitWork<'_>,
        limit: Option<Duration>,
        on_row: &dyn Fn(usize),
    ) -> DbResult<(usize, u64)> {
        let casts = match work {
            CommitWork::Batch { template, .. } => parameter_casts(conn, template, limit).await?,
            CommitWork::Single(_) => Vec::new(),
        };

        let mut tx = conn.begin().await?;
        let mut executed = 0;
        let mut affected = 0;

        match work {
            CommitWork::Single(sql) => {
                let result = run_bounded(limit, "commit statement", (&mut *tx).execute(*sql)).await?;
                executed += 1;
                affected += result.rows_affected();
            }
            CommitWork::Batch { template, rows } => {
                let sql = template.cast_sql(&casts);
                if !casts.is_empty() {
                    debug!(sql = %sql, "Casting text values to server parameter types");
                }
                for (index, row) in rows.iter().enumerate() {
                    // argument types can differ between rows, so nothing is cached
                    let mut query = sqlx::query(&sql).persistent(false);
                    for (position, param) in template.arguments(row)?.into_iter().enumerate() {
                        let typed = casts.get(position).is_some_and(Option::is_some);
                        let param = match param {
                            QueryParam::String(v) if typed && v.is_empty() => &NULL,
                            _ => param,
                        };
                        query = bind_postgres_param(query, param);
                    }
                    let result = run_bounded(limit, "commit statement", query.execute(&mut *tx)).await?;
                    executed += 1;
                    affected += result.rows_affected();
                    on_row(index);
                }
            }
        }

        run_bounded(limit, "commit", tx.commit()).await?;
        Ok((executed, affected))
    }

    /// Cast for each rewritten placeholder whose inferred type is not text.
    ///
    /// Values are bound with the type they carry, so a text cell from a CSV file
    /// would not fit an INTEGER column without `$n::INT4`.
    async fn parameter_casts(
        conn: &mut PgConnection,
        template: &StatementTemplate,
        limit: Option<Duration>,
    ) -> DbResult<Vec<Option<String>>> {
        if template.is_native() {
            return Ok(Vec::new());
        }

        let described = run_bounded(limit, "statement preparation", async {
            let statement = (&mut *conn).prepare(template.sql()).await?;
            Ok::<_, sqlx::Error>(match statement.parameters() {
                Some(Either::Left(types)) => types.iter().map(cast_for).collect::<Vec<_>>(),
                _ => Vec::new(),
            })
        })
        .await;
        // the described statement would pin the inferred types for later binds
        conn.clear_cached_statements().await?;

        match described {
            Ok(casts) => Ok(casts),
            Err(e) => {
                debug!(error = %e, "Could not describe statement parameters");
                Ok(Vec::new())
            }
        }
    }

    pub(super) fn cast_for(ty: &PgTypeInfo) -> Option<String> {
        match ty.name() {
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => None,
            name => Some(name.to_string()),
        }
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column, Connection, Executor, SqliteConnection, Statement};

    pub async fn fetch(
        conn: &mut SqliteConnection,
        sql: &str,
    ) -> Result<(Vec<String>, Vec<SqliteRow>), sqlx::Error> {
        let statement = (&mut *conn).prepare(sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = statement.query().fetch_all(&mut *conn).await?;
        Ok((columns, rows))
    }

    pub(super) async fn commit(
        conn: &mut SqliteConnection,
        work: &CommitWork<'_>,
        limit: Option<Duration>,
        on_row: &dyn Fn(usize),
    ) -> DbResult<(usize, u64)> {
        let mut tx = conn.begin().await?;
        let mut executed = 0;
        let mut affected = 0;

        match work {
            CommitWork::Single(sql) => {
                let result = run_bounded(limit, "commit statement", (&mut *tx).execute(*sql)).await?;
                executed += 1;
                affected += result.rows_affected();
            }
            CommitWork::Batch { template, rows } => {
                for (index, row) in rows.iter().enumerate() {
                    let mut query = sqlx::query(template.sql());
                    for param in template.arguments(row)? {
                        query = bind_sqlite_param(query, param);
                    }
                    let result = run_bounded(limit, "commit statement", query.execute(&mut *tx)).await?;
                    executed += 1;
                    affected += result.rows_affected();
                    on_row(index);
                }
            }
        }

        run_bounded(limit, "commit", tx.commit()).await?;
        Ok((executed, affected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_defaults() {
        let executor = QueryExecutor::new(Console::quiet());
        assert_eq!(executor.statement_timeout, None);
        assert!(executor.decode_binary);
    }

    #[test]
    fn test_executor_custom_settings() {
        let executor = QueryExecutor::new(Console::quiet())
            .with_timeout(Some(Duration::from_secs(60)))
            .with_decode_binary(false);
        assert_eq!(executor.statement_timeout, Some(Duration::from_secs(60)));
        assert!(!executor.decode_binary);
    }

    #[test]
    fn test_postgres_casts_only_non_text_parameters() {
        use sqlx::postgres::PgTypeInfo;

        assert_eq!(postgres::cast_for(&PgTypeInfo::with_name("TEXT")), None);
        assert_eq!(postgres::cast_for(&PgTypeInfo::with_name("VARCHAR")), None);
        assert_eq!(
            postgres::cast_for(&PgTypeInfo::with_name("INT4")),
            Some("INT4".to_string())
        );
        assert_eq!(
            postgres::cast_for(&PgTypeInfo::with_name("TIMESTAMPTZ")),
            Some("TIMESTAMPTZ".to_string())
        );
    }

    #[tokio::test]
    async fn test_run_bounded_times_out() {
        let err = run_bounded(Some(Duration::from_millis(10)), "query execution", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_run_bounded_maps_driver_errors() {
        let err = run_bounded(None, "query execution", async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::Database { .. }));
    }
}

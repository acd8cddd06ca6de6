//! Commit driver.
//!
//! Connects with write access, runs the statement for every data row inside one
//! transaction and closes the connection whatever the outcome.

use crate::console::Console;
use crate::db::{Connector, QueryExecutor};
use crate::error::DbResult;
use crate::models::{CommitRow, CommitSummary, ConnectionConfig};
use crate::tools::no_connection;
use tracing::info;

pub struct CommitHandler {
    connector: Connector,
    executor: QueryExecutor,
}

impl CommitHandler {
    pub fn new(console: Console) -> Self {
        Self {
            connector: Connector::new(console),
            executor: QueryExecutor::new(console),
        }
    }

    /// Use custom executor settings (statement timeout).
    pub fn with_executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Execute `statement` once per row of `rows` (or once when empty) and commit.
    pub async fn run(
        &self,
        config: &ConnectionConfig,
        statement: &str,
        rows: &[CommitRow],
    ) -> DbResult<CommitSummary> {
        let config = config.clone().writable(true);
        let Some(mut conn) = self.connector.connect(&config).await else {
            return Err(no_connection());
        };

        let result = self.executor.commit(&mut conn, statement, rows).await;
        self.connector.close(conn).await;

        let summary = result?;
        info!(
            mode = ?summary.mode,
            rows_supplied = rows.len(),
            statements = summary.statements_executed,
            rows_affected = summary.rows_affected,
            execution_time_ms = summary.execution_time_ms,
            "Commit finished"
        );
        Ok(summary)
    }
}

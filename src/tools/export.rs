//! Export driver.
//!
//! Connects once, runs every entry of the query list in order and writes each
//! result to its own CSV file. The first failing query or file aborts the run;
//! the connection is closed on every exit path.

use crate::config::{DEFAULT_OUTPUT_FOLDER, LineEnding};
use crate::console::Console;
use crate::db::{Connector, DbConnection, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, ExportSummary, ExportedFile, QueryResult, QuerySpec};
use crate::tools::format::{derive_filename, format_size, normalize_whitespace, write_result};
use crate::tools::no_connection;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// `<desktop>/Queries`, falling back to `<home>/Queries`, then `./Queries`.
pub fn default_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_OUTPUT_FOLDER)
}

/// Handler for export runs.
pub struct ExportHandler {
    connector: Connector,
    executor: QueryExecutor,
    console: Console,
    output_dir: PathBuf,
    line_ending: LineEnding,
}

impl ExportHandler {
    pub fn new(console: Console, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            connector: Connector::new(console),
            executor: QueryExecutor::new(console),
            console,
            output_dir: output_dir.into(),
            line_ending: LineEnding::default(),
        }
    }

    /// Use custom executor settings (timeout, binary handling).
    pub fn with_executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Connect with `config` and export every query.
    pub async fn run(
        &self,
        config: &ConnectionConfig,
        queries: &[QuerySpec],
    ) -> DbResult<ExportSummary> {
        let conn = self.connector.connect(config).await;
        self.export(conn, queries).await
    }

    /// Export every query over `conn`, then close it.
    ///
    /// An absent connection fails with a connection error before anything is written.
    pub async fn export(
        &self,
        conn: Option<DbConnection>,
        queries: &[QuerySpec],
    ) -> DbResult<ExportSummary> {
        let Some(mut conn) = conn else {
            return Err(no_connection());
        };

        let result = self.export_all(&mut conn, queries).await;
        self.connector.close(conn).await;

        match &result {
            Ok(summary) => info!(
                files = summary.files.len(),
                rows = summary.total_rows(),
                output_dir = %self.output_dir.display(),
                "Export finished"
            ),
            Err(e) => warn!(error = %e, "Export aborted"),
        }
        result
    }

    async fn export_all(
        &self,
        conn: &mut DbConnection,
        queries: &[QuerySpec],
    ) -> DbResult<ExportSummary> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| DbError::file(&self.output_dir, e))?;

        let total = queries.len();
        let mut summary = ExportSummary::default();

        for (i, spec) in queries.iter().enumerate() {
            let index = i + 1;
            self.console.status(format!("Query {} of {}:", index, total));
            info!(
                index = index,
                total = total,
                description = %spec.description,
                "Query {} of {}",
                index,
                total
            );

            let path = self.output_dir.join(derive_filename(index, &spec.description));
            let sql = normalize_whitespace(&spec.sql);

            let result = self.executor.query(conn, &sql).await?;
            let bytes = self.write_file(&path, &sql, &result)?;

            self.console.status(format!(
                "Saved {} ({} rows)",
                path.display(),
                result.row_count()
            ));
            self.console.status("");
            info!(
                path = %path.display(),
                rows = result.row_count(),
                size = %format_size(bytes),
                "Wrote output file"
            );

            summary.files.push(ExportedFile {
                path,
                rows: result.row_count(),
                bytes,
            });
        }

        Ok(summary)
    }

    /// Write one output file and return its size in bytes.
    fn write_file(&self, path: &Path, sql: &str, result: &QueryResult) -> DbResult<u64> {
        let written = File::create(path)
            .map_err(|e| DbError::file(path, e))
            .and_then(|file| {
                write_result(BufWriter::new(file), sql, result, self.line_ending)
                    .map_err(|e| csv_write_error(path, e))
            })
            .and_then(|mut writer| {
                writer.flush().map_err(|e| DbError::file(path, e))?;
                let file = writer
                    .into_inner()
                    .map_err(|e| DbError::file(path, e.into_error()))?;
                file.metadata()
                    .map(|m| m.len())
                    .map_err(|e| DbError::file(path, e))
            });

        if written.is_err() && path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Could not remove partial output file");
            }
        }
        written
    }
}

fn csv_write_error(path: &Path, err: csv::Error) -> DbError {
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => DbError::file(path, io_err),
        other => DbError::internal(format!("CSV error writing {}: {:?}", path.display(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_output_dir_ends_with_queries() {
        assert!(default_output_dir().ends_with(DEFAULT_OUTPUT_FOLDER));
    }

    #[tokio::test]
    async fn test_absent_connection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let handler = ExportHandler::new(Console::quiet(), &out);

        let err = handler
            .export(None, &[QuerySpec::new("SELECT 1", "One")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(!out.exists());
    }

    #[test]
    fn test_write_file_into_missing_dir_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ExportHandler::new(Console::quiet(), dir.path());
        let path = dir.path().join("missing").join("1. x.csv");

        let err = handler
            .write_file(&path, "SELECT 1", &QueryResult::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }
}

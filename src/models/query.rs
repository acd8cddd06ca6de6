//! Query-related data models.
//!
//! This module defines the query list entries, bound parameter values and the
//! results produced by the query and commit runners.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;

/// A parameter value bound into a commit statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// One row of values for a batch commit.
pub type CommitRow = Vec<QueryParam>;

/// One entry of the query list: the statement and the description used to name its
/// output file.
///
/// Deserializes from `{"sql": "...", "description": "..."}` or `["sql", "description"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "QuerySpecRepr")]
pub struct QuerySpec {
    pub sql: String,
    pub description: String,
}

impl QuerySpec {
    pub fn new(sql: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            description: description.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuerySpecRepr {
    Object { sql: String, description: String },
    Pair(String, String),
}

impl From<QuerySpecRepr> for QuerySpec {
    fn from(repr: QuerySpecRepr) -> Self {
        match repr {
            QuerySpecRepr::Object { sql, description } | QuerySpecRepr::Pair(sql, description) => {
                Self { sql, description }
            }
        }
    }
}

/// Column names and fully materialized rows of one query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in declaration order
    pub columns: Vec<String>,
    /// Rows in the order the database returned them
    pub rows: Vec<Vec<JsonValue>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// How a commit call ran its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// One execution per supplied row.
    Batch,
    /// One verbatim execution.
    Single,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitSummary {
    pub mode: CommitMode,
    /// Number of statement executions inside the transaction
    pub statements_executed: usize,
    pub rows_affected: u64,
    pub execution_time_ms: u64,
}

impl CommitSummary {
    /// Closing message, e.g. "Committed 1 row." / "Committed 3 rows." / "Commit."
    pub fn message(&self) -> String {
        match (self.mode, self.statements_executed) {
            (CommitMode::Single, _) => "Commit.".to_string(),
            (CommitMode::Batch, 1) => "Committed 1 row.".to_string(),
            (CommitMode::Batch, n) => format!("Committed {} rows.", n),
        }
    }
}

/// One output file written by an export run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

/// Files written by an export run, in query-list order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub files: Vec<ExportedFile>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|f| f.rows).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_types() {
        assert_eq!(QueryParam::from(42), QueryParam::Int(42));
        assert_eq!(QueryParam::from("hello"), QueryParam::String("hello".into()));
    }

    #[test]
    fn test_query_param_deserialize_untagged() {
        let row: CommitRow = serde_json::from_str(r#"[null, true, 7, 1.5, "x"]"#).unwrap();
        assert_eq!(
            row,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(7),
                QueryParam::Float(1.5),
                QueryParam::String("x".into()),
            ]
        );
    }

    #[test]
    fn test_query_spec_both_forms() {
        let specs: Vec<QuerySpec> = serde_json::from_str(
            r#"[
                {"sql": "SELECT 1", "description": "One"},
                ["SELECT 2", "Two"]
            ]"#,
        )
        .unwrap();
        assert_eq!(specs[0], QuerySpec::new("SELECT 1", "One"));
        assert_eq!(specs[1], QuerySpec::new("SELECT 2", "Two"));
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult {
            columns: vec!["X".into()],
            ..Default::default()
        };
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn test_commit_messages() {
        let summary = |mode, n| CommitSummary {
            mode,
            statements_executed: n,
            rows_affected: 0,
            execution_time_ms: 0,
        };
        assert_eq!(summary(CommitMode::Batch, 1).message(), "Committed 1 row.");
        assert_eq!(summary(CommitMode::Batch, 3).message(), "Committed 3 rows.");
        assert_eq!(summary(CommitMode::Single, 1).message(), "Commit.");
    }
}

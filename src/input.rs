//! Loading the operator-supplied inputs: the query list, commit statements and
//! commit rows.

use crate::error::{DbError, DbResult};
use crate::models::{CommitRow, QueryParam, QuerySpec};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Load the query list from a JSON file.
///
/// Each entry is `{"sql": ..., "description": ...}` or `[sql, description]`.
pub fn load_queries(path: &Path) -> DbResult<Vec<QuerySpec>> {
    let file = File::open(path).map_err(|e| DbError::file(path, e))?;
    let queries: Vec<QuerySpec> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| DbError::invalid_input(format!("{}: {}", path.display(), e)))?;

    if let Some(index) = queries.iter().position(|q| q.sql.trim().is_empty()) {
        return Err(DbError::invalid_input(format!(
            "{}: query {} has no SQL text",
            path.display(),
            index + 1
        )));
    }

    info!(path = %path.display(), count = queries.len(), "Loaded query list");
    Ok(queries)
}

/// Read a statement from a file, dropping surrounding whitespace.
pub fn load_statement(path: &Path) -> DbResult<String> {
    let text = std::fs::read_to_string(path).map_err(|e| DbError::file(path, e))?;
    let statement = text.trim();
    if statement.is_empty() {
        return Err(DbError::invalid_input(format!(
            "{}: statement file is empty",
            path.display()
        )));
    }
    Ok(statement.to_string())
}

/// Load commit rows from a `.json` file (array of arrays) or a CSV file.
///
/// CSV values are all bound as strings; on PostgreSQL they are cast to the
/// parameter type the server infers. `has_header` skips the first CSV record.
pub fn load_rows(path: &Path, has_header: bool) -> DbResult<Vec<CommitRow>> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let file = File::open(path).map_err(|e| DbError::file(path, e))?;
    let rows = if is_json {
        serde_json::from_reader::<_, Vec<CommitRow>>(BufReader::new(file))
            .map_err(|e| DbError::invalid_input(format!("{}: {}", path.display(), e)))?
    } else {
        read_csv_rows(file, has_header)
            .map_err(|e| DbError::invalid_input(format!("{}: {}", path.display(), e)))?
    };

    debug!(path = %path.display(), json = is_json, "Parsed data file");
    info!(path = %path.display(), rows = rows.len(), "Loaded commit rows");
    Ok(rows)
}

fn read_csv_rows(file: File, has_header: bool) -> Result<Vec<CommitRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_reader(BufReader::new(file));

    reader
        .records()
        .map(|record| {
            record.map(|r| r.iter().map(QueryParam::from).collect::<CommitRow>())
        })
        .collect()
}

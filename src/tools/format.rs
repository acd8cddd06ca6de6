//! Output formatting for exported query results.
//!
//! Output files start with a UTF-8 byte-order mark, then the query text as a single
//! field, an empty line, the header record and one record per result row. Fields
//! are quoted only when they need to be.

use crate::config::LineEnding;
use crate::models::QueryResult;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value as JsonValue;
use std::io::Write;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Characters that cannot appear in a file name on common platforms.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Trim `text` and collapse every run of spaces into a single space.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Output file name for the `index`-th (1-based) query of the list.
///
/// ```
/// use db_query_export::tools::format::derive_filename;
///
/// assert_eq!(derive_filename(1, "  Test  Query "), "1. Test Query.csv");
/// assert_eq!(derive_filename(2, "In/Out: 2024"), "2. In_Out_ 2024.csv");
/// ```
pub fn derive_filename(index: usize, description: &str) -> String {
    let name: String = normalize_whitespace(description)
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("{}. {}.csv", index, name)
}

/// Render one cell. NULL becomes an empty field.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

/// Human-readable file size, 1024-based.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::WINDOWS)
}

fn terminator_bytes(line_ending: LineEnding) -> &'static [u8] {
    match line_ending {
        LineEnding::Crlf => b"\r\n",
        LineEnding::Lf => b"\n",
    }
}

/// Write `query` and `result` to `out` and hand the writer back.
pub fn write_result<W: Write>(
    mut out: W,
    query: &str,
    result: &QueryResult,
    line_ending: LineEnding,
) -> Result<W, csv::Error> {
    out.write_all(UTF8_BOM)?;

    let mut writer = csv_writer(out, line_ending);
    writer.write_record([query])?;
    let mut out = into_inner(writer)?;

    // csv writes `""` for an empty record, so the separator line goes in raw
    out.write_all(terminator_bytes(line_ending))?;

    let mut writer = csv_writer(out, line_ending);
    if !result.columns.is_empty() {
        writer.write_record(&result.columns)?;
    }
    for row in &result.rows {
        writer.write_record(row.iter().map(format_value))?;
    }
    into_inner(writer)
}

fn csv_writer<W: Write>(out: W, line_ending: LineEnding) -> csv::Writer<W> {
    let terminator = match line_ending {
        LineEnding::Crlf => Terminator::CRLF,
        LineEnding::Lf => Terminator::Any(b'\n'),
    };
    WriterBuilder::new()
        .terminator(terminator)
        .quote_style(QuoteStyle::Necessary)
        .flexible(true)
        .from_writer(out)
}

fn into_inner<W: Write>(writer: csv::Writer<W>) -> Result<W, csv::Error> {
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

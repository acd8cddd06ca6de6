//! Statement templates for batch commits.
//!
//! A template may be written with the driver's own placeholders (`?`, `$1`) or in
//! format style with `{}` / `{N}` slots. Format-style slots are rewritten to native
//! placeholders and each row value is bound, never spliced into the SQL text.
//! A slot that fills a whole string literal (`'{}'`) loses its quotes because the
//! bound value already carries its type. A slot inside a longer literal
//! (`'%{}%'`) splits the literal into a concatenation around the placeholder.
//! `{{` and `}}` stand for literal braces. Comments are copied untouched.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, QueryParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numbering {
    /// No format-style slots; the SQL already uses native placeholders.
    Native,
    Automatic,
    Explicit,
}

/// A parsed statement template, ready to bind rows against.
#[derive(Debug, Clone)]
pub struct StatementTemplate {
    sql: String,
    /// Row index bound to each placeholder, in placeholder order.
    slots: Vec<usize>,
    /// Byte offset in `sql` just past each rewritten placeholder.
    placeholder_ends: Vec<usize>,
    numbering: Numbering,
}

enum Brace {
    Escaped(char),
    Slot(String),
}

/// Piece of a string literal: raw text or the row index of a slot.
enum Piece {
    Text(String),
    Slot(usize),
}

struct Rewriter {
    db_type: DatabaseType,
    sql: String,
    slots: Vec<usize>,
    placeholder_ends: Vec<usize>,
    numbering: Numbering,
    automatic: usize,
}

impl StatementTemplate {
    /// Parse `template` and rewrite its slots into placeholders for `db_type`.
    pub fn parse(template: &str, db_type: DatabaseType) -> DbResult<Self> {
        let chars: Vec<char> = template.chars().collect();
        let mut out = Rewriter {
            db_type,
            sql: String::with_capacity(template.len()),
            slots: Vec::new(),
            placeholder_ends: Vec::new(),
            numbering: Numbering::Native,
            automatic: 0,
        };
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '\'' => i = out.literal(&chars, i)?,
                '-' if chars.get(i + 1) == Some(&'-') => {
                    let end = find_from(&chars, i, "\n").map_or(chars.len(), |n| n + 1);
                    out.sql.extend(&chars[i..end]);
                    i = end;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    let end = find_from(&chars, i + 2, "*/").map_or(chars.len(), |n| n + 2);
                    out.sql.extend(&chars[i..end]);
                    i = end;
                }
                '{' | '}' => {
                    let (brace, next) = read_brace(&chars, i)?;
                    match brace {
                        Brace::Escaped(c) => out.sql.push(c),
                        Brace::Slot(field) => {
                            let index = out.slot_index(&field)?;
                            out.push_placeholder(index);
                        }
                    }
                    i = next;
                }
                c => {
                    out.sql.push(c);
                    i += 1;
                }
            }
        }

        Ok(Self {
            sql: out.sql,
            slots: out.slots,
            placeholder_ends: out.placeholder_ends,
            numbering: out.numbering,
        })
    }

    /// The SQL text sent to the database.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The SQL text with `::type` appended to each rewritten placeholder that has
    /// a cast in `casts` (indexed by placeholder order).
    pub fn cast_sql(&self, casts: &[Option<String>]) -> String {
        let mut sql = String::with_capacity(self.sql.len() + casts.len() * 8);
        let mut last = 0;
        for (&end, cast) in self.placeholder_ends.iter().zip(casts) {
            sql.push_str(&self.sql[last..end]);
            if let Some(ty) = cast {
                sql.push_str("::");
                sql.push_str(ty);
            }
            last = end;
        }
        sql.push_str(&self.sql[last..]);
        sql
    }

    /// Whether the template relies on the driver's own placeholders.
    pub fn is_native(&self) -> bool {
        self.numbering == Numbering::Native
    }

    /// Values to bind for `row`, in placeholder order.
    ///
    /// Native templates bind the whole row in order; format-style templates bind
    /// the value each slot refers to.
    pub fn arguments<'r>(&self, row: &'r [QueryParam]) -> DbResult<Vec<&'r QueryParam>> {
        if self.is_native() {
            return Ok(row.iter().collect());
        }

        self.slots
            .iter()
            .map(|&index| {
                row.get(index).ok_or_else(|| {
                    DbError::invalid_input(format!(
                        "Statement template refers to value {} but the row has only {} value(s)",
                        index,
                        row.len()
                    ))
                })
            })
            .collect()
    }
}

impl Rewriter {
    /// Row index for a slot, enforcing one numbering style per template.
    fn slot_index(&mut self, field: &str) -> DbResult<usize> {
        if field.is_empty() {
            if self.numbering == Numbering::Explicit {
                return Err(mixed_numbering());
            }
            self.numbering = Numbering::Automatic;
            self.automatic += 1;
            return Ok(self.automatic - 1);
        }

        let index = field.parse::<usize>().map_err(|_| {
            DbError::invalid_input(format!(
                "Unsupported placeholder '{{{}}}' in statement template; only {{}} and {{N}} are allowed",
                field
            ))
        })?;
        if self.numbering == Numbering::Automatic {
            return Err(mixed_numbering());
        }
        self.numbering = Numbering::Explicit;
        Ok(index)
    }

    fn push_placeholder(&mut self, index: usize) {
        self.slots.push(index);
        if self.db_type.numbered_placeholders() {
            self.sql.push_str(&format!("${}", self.slots.len()));
        } else {
            self.sql.push('?');
        }
        self.placeholder_ends.push(self.sql.len());
    }

    /// Copy the string literal opening at `start`, returning the index after it.
    fn literal(&mut self, chars: &[char], start: usize) -> DbResult<usize> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut i = start + 1;

        loop {
            let Some(&c) = chars.get(i) else {
                return Err(DbError::invalid_input(format!(
                    "Unterminated string literal at position {} in statement template",
                    start
                )));
            };
            match c {
                '\'' if chars.get(i + 1) == Some(&'\'') => {
                    text.push_str("''");
                    i += 2;
                }
                '\'' => {
                    i += 1;
                    break;
                }
                // MySQL escapes inside literals by default
                '\\' if self.db_type == DatabaseType::MySQL => {
                    text.push('\\');
                    if let Some(&next) = chars.get(i + 1) {
                        text.push(next);
                    }
                    i += 2;
                }
                '{' | '}' => {
                    let (brace, next) = read_brace(chars, i)?;
                    match brace {
                        Brace::Escaped(c) => text.push(c),
                        Brace::Slot(field) => {
                            let index = self.slot_index(&field)?;
                            if !text.is_empty() {
                                pieces.push(Piece::Text(std::mem::take(&mut text)));
                            }
                            pieces.push(Piece::Slot(index));
                        }
                    }
                    i = next;
                }
                c => {
                    text.push(c);
                    i += 1;
                }
            }
        }

        if pieces.is_empty() {
            self.sql.push('\'');
            self.sql.push_str(&text);
            self.sql.push('\'');
            return Ok(i);
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }

        let mysql = self.db_type == DatabaseType::MySQL;
        let concat = pieces.len() > 1;
        if concat {
            self.sql.push_str(if mysql { "CONCAT(" } else { "(" });
        }
        for (n, piece) in pieces.into_iter().enumerate() {
            if n > 0 {
                self.sql.push_str(if mysql { ", " } else { " || " });
            }
            match piece {
                Piece::Text(text) => {
                    self.sql.push('\'');
                    self.sql.push_str(&text);
                    self.sql.push('\'');
                }
                Piece::Slot(index) => self.push_placeholder(index),
            }
        }
        if concat {
            self.sql.push(')');
        }
        Ok(i)
    }
}

/// Read the brace at `i`: an escaped `{{` / `}}` or a `{field}` slot.
fn read_brace(chars: &[char], i: usize) -> DbResult<(Brace, usize)> {
    match chars[i] {
        '{' if chars.get(i + 1) == Some(&'{') => Ok((Brace::Escaped('{'), i + 2)),
        '}' if chars.get(i + 1) == Some(&'}') => Ok((Brace::Escaped('}'), i + 2)),
        '}' => Err(DbError::invalid_input(format!(
            "Single '}}' at position {} in statement template; use '}}}}' for a literal brace",
            i
        ))),
        _ => {
            let close = chars[i + 1..]
                .iter()
                .position(|&c| c == '}')
                .map(|offset| i + 1 + offset)
                .ok_or_else(|| {
                    DbError::invalid_input(format!(
                        "Unclosed '{{' at position {} in statement template",
                        i
                    ))
                })?;
            let field: String = chars[i + 1..close].iter().collect();
            Ok((Brace::Slot(field.trim().to_string()), close + 1))
        }
    }
}

fn find_from(chars: &[char], from: usize, needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    chars
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle.as_slice())
        .map(|offset| from + offset)
}

fn mixed_numbering() -> DbError {
    DbError::invalid_input(
        "Statement template mixes automatic '{}' and numbered '{N}' placeholders",
    )
}

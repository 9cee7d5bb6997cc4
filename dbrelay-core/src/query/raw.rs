//! Caller-supplied SQL.
//!
//! This is the one escape hatch around identifier validation: the SQL text is
//! sent as written and the caller is responsible for its safety. Values should
//! still be passed through `params` so they are bound rather than inlined.

use serde_json::Value;

use crate::{DbRelayError, Result};

const ROW_RETURNING_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "PRAGMA", "VALUES", "TABLE",
];

/// Whether a statement produces a row set or only an affected-row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Rows,
    Command,
}

impl StatementKind {
    /// Classifies SQL by its first keyword, skipping leading comments and
    /// parentheses. Statements with a `RETURNING` clause produce rows; the
    /// word only counts outside string literals, quoted names and comments.
    pub fn classify(sql: &str) -> Self {
        let keyword = leading_keyword(sql).to_ascii_uppercase();
        let returns_rows = ROW_RETURNING_KEYWORDS.contains(&keyword.as_str())
            || code_words(sql)
                .iter()
                .any(|word| word.eq_ignore_ascii_case("RETURNING"));
        if returns_rows { Self::Rows } else { Self::Command }
    }
}

/// True for `INSERT` and `REPLACE` statements, the only ones that can
/// generate a row id.
pub fn inserts_rows(sql: &str) -> bool {
    let keyword = leading_keyword(sql);
    keyword.eq_ignore_ascii_case("INSERT") || keyword.eq_ignore_ascii_case("REPLACE")
}

fn leading_keyword(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, after)| after);
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, after)| after);
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Bare words of `sql`, skipping quoted text and comments.
fn code_words(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut words = Vec::new();
    let mut word_start = None;
    let mut i = 0;
    while let Some(&byte) = bytes.get(i) {
        let is_word = byte.is_ascii_alphanumeric() || byte == b'_';
        if is_word {
            word_start.get_or_insert(i);
            i = i.saturating_add(1);
            continue;
        }
        if let Some(start) = word_start.take() {
            words.push(&sql[start..i]);
        }
        let next = i.saturating_add(1);
        i = match (byte, bytes.get(next)) {
            (b'\'' | b'"' | b'`', _) => skip_past(bytes, next, &[byte]),
            (b'-', Some(b'-')) => skip_past(bytes, next.saturating_add(1), b"\n"),
            (b'/', Some(b'*')) => skip_past(bytes, next.saturating_add(1), b"*/"),
            _ => next,
        };
    }
    if let Some(start) = word_start {
        words.push(&sql[start..]);
    }
    words
}

/// Index just past the next `terminator` at or after `from`, or the end.
fn skip_past(bytes: &[u8], from: usize, terminator: &[u8]) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| {
            rest.windows(terminator.len())
                .position(|window| window == terminator)
        })
        .map_or(bytes.len(), |offset| {
            from.saturating_add(offset).saturating_add(terminator.len())
        })
}

/// Raw SQL plus explicit parameters; never identifier-validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl RawQuery {
    /// # Errors
    /// Fails with `InvalidArguments` when `sql` is blank.
    pub fn new(sql: &str, params: Vec<Value>) -> Result<Self> {
        if sql.trim().is_empty() {
            return Err(DbRelayError::invalid_arguments("SQL query is required"));
        }
        Ok(Self {
            sql: sql.to_string(),
            params,
        })
    }

    pub fn kind(&self) -> StatementKind {
        StatementKind::classify(&self.sql)
    }
}

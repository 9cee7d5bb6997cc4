//! Identifier validation for names interpolated into SQL.
//!
//! Table and column names cannot be bound as parameters, so every name that
//! reaches a SQL template passes through [`validate_identifier`] first. Values
//! are never checked here: they always travel as bound parameters.
//!
//! The grammar is `^[A-Za-z_][A-Za-z0-9_]*$`, optionally prefixed by one
//! qualifier segment of the same shape (`schema.table` or `table.column`).
//! There is no length limit and no reserved-word list.
//!
//! # Example
//! ```rust
//! use dbrelay_core::validation::{IdentifierKind, validate_identifier};
//!
//! assert!(validate_identifier("users", IdentifierKind::Table).is_ok());
//! assert!(validate_identifier("u.email", IdentifierKind::Column).is_ok());
//! assert!(validate_identifier("users; DROP TABLE users;", IdentifierKind::Table).is_err());
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::{DbRelayError, Result};

#[allow(clippy::expect_used)]
static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier pattern is a valid regex")
});

/// What an identifier names, used for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// A table, optionally schema-qualified
    Table,
    /// A column, optionally table-qualified
    Column,
}

impl IdentifierKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Column => "column",
        }
    }

    const fn hint(self) -> &'static str {
        match self {
            Self::Table => {
                "Table names must contain only letters, numbers, underscores, and optional schema prefix."
            }
            Self::Column => {
                "Column names must contain only letters, numbers, underscores, and optional table prefix."
            }
        }
    }
}

/// Checks a single name against the identifier grammar.
///
/// # Errors
/// Returns [`DbRelayError::InvalidIdentifier`] naming the rejected input.
pub fn validate_identifier(name: &str, kind: IdentifierKind) -> Result<()> {
    if IDENTIFIER_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(DbRelayError::InvalidIdentifier {
            kind: kind.label(),
            name: name.to_string(),
            hint: kind.hint(),
        })
    }
}

/// Checks every name in a list; the first failure fails the whole call.
///
/// A single name can be passed as a one-element slice or iterator.
///
/// # Errors
/// Returns [`DbRelayError::InvalidIdentifier`] for the first offending entry.
pub fn validate_identifier_list<I, S>(names: I, kind: IdentifierKind) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .try_for_each(|name| validate_identifier(name.as_ref(), kind))
}

/// Splits an already-validated `qualifier.name` into its two segments.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((qualifier, rest)) => (Some(qualifier), rest),
        None => (None, name),
    }
}

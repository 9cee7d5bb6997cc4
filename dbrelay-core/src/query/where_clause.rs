//! Equality/NULL WHERE conditions shared by SELECT, UPDATE and DELETE.

use serde_json::{Map, Value};

use super::ParamSink;
use crate::Result;
use crate::models::PlaceholderStyle;
use crate::validation::{IdentifierKind, validate_identifier};

/// Ordered AND-conjunction of `column = value` / `column IS NULL` tests.
///
/// Only equality and NULL checks are supported; there is no OR, IN or range
/// support.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    conditions: Vec<(String, Value)>,
}

impl WhereClause {
    /// Creates an empty clause
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Builds a clause from a JSON mapping, validating every column.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` on the first bad column name.
    pub fn from_map(conditions: &Map<String, Value>) -> Result<Self> {
        conditions
            .iter()
            .try_fold(Self::new(), |clause, (column, value)| {
                clause.eq(column, value.clone())
            })
    }

    /// Appends a condition; a JSON `null` value becomes `IS NULL`.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` if `column` is not a valid name.
    pub fn eq(mut self, column: &str, value: Value) -> Result<Self> {
        validate_identifier(column, IdentifierKind::Column)?;
        self.conditions.push((column.to_string(), value));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Renders the clause body (without the `WHERE` keyword) using `?`
    /// placeholders.
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut sink = ParamSink::new(PlaceholderStyle::QuestionMark);
        let sql = self.render(&mut sink);
        (sql, sink.params)
    }

    pub(super) fn render(&self, sink: &mut ParamSink<'_>) -> String {
        self.conditions
            .iter()
            .map(|(column, value)| {
                if value.is_null() {
                    format!("{} IS NULL", column)
                } else {
                    let placeholder = sink.push_for(column, value.clone());
                    format!("{} = {}", column, placeholder)
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Appends ` WHERE ...` to `sql` when there is at least one condition.
    pub(super) fn append_to(&self, sql: &mut String, sink: &mut ParamSink<'_>) {
        if !self.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render(sink));
        }
    }
}

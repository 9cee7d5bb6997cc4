//! Parameterized SQL construction.
//!
//! Builders take validated identifiers and untrusted values and produce a
//! [`BuiltQuery`]: SQL text plus the ordered parameters to bind. Names are
//! validated with [`crate::validation`] before they are interpolated; values
//! only ever travel as bound parameters.
//!
//! # Examples
//!
//! ```rust
//! use dbrelay_core::query::{SelectQuery, WhereClause, OrderDirection};
//! use dbrelay_core::PlaceholderStyle;
//! use serde_json::json;
//!
//! let filter = WhereClause::new().eq("active", json!(true))?;
//! let query = SelectQuery::new("users")?
//!     .columns(["id", "name"])?
//!     .filter(filter)
//!     .order_by("name", OrderDirection::Asc)?
//!     .limit(10)
//!     .offset(20)
//!     .build(PlaceholderStyle::Numbered);
//!
//! assert_eq!(
//!     query.sql,
//!     "SELECT id, name FROM users WHERE active = $1 ORDER BY name ASC LIMIT 10 OFFSET 20"
//! );
//! assert_eq!(query.params, vec![json!(true)]);
//! # Ok::<(), dbrelay_core::DbRelayError>(())
//! ```

mod mutation;
mod raw;
mod select;
mod where_clause;

pub use mutation::{DeleteQuery, InsertQuery, UpdateQuery};
pub use raw::{RawQuery, StatementKind, inserts_rows};
pub use select::{OrderDirection, SelectQuery, coerce_integer};
pub use where_clause::WhereClause;

use std::collections::HashMap;

use serde_json::Value;

use crate::models::PlaceholderStyle;

/// SQL text with the parameters to bind, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Declared SQL type of each column, keyed by column name.
///
/// With numbered placeholders, a text-bound value aimed at a typed column is
/// written as `$n::type` so the server converts it explicitly.
pub type ColumnTypes = HashMap<String, String>;

/// Collects parameters and hands out the matching placeholder text.
///
/// A JSON `null` is written as the `NULL` keyword instead of being bound, so
/// no driver has to guess a type for an untyped null parameter.
#[derive(Debug)]
struct ParamSink<'a> {
    style: PlaceholderStyle,
    params: Vec<Value>,
    column_types: Option<&'a ColumnTypes>,
}

impl<'a> ParamSink<'a> {
    const fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            params: Vec::new(),
            column_types: None,
        }
    }

    fn typed(style: PlaceholderStyle, column_types: &'a ColumnTypes) -> Self {
        Self {
            column_types: (!column_types.is_empty()).then_some(column_types),
            ..Self::new(style)
        }
    }

    fn push(&mut self, value: Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.params.push(value);
        match self.style {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${}", self.params.len()),
        }
    }

    /// Like [`Self::push`], casting text-bound values to the column's type.
    fn push_for(&mut self, column: &str, value: Value) -> String {
        let binds_as_text = matches!(
            value,
            Value::String(_) | Value::Array(_) | Value::Object(_)
        );
        let cast = self
            .column_types
            .filter(|_| binds_as_text && self.style == PlaceholderStyle::Numbered)
            .and_then(|types| {
                let name = column.rsplit('.').next().unwrap_or(column);
                types.get(name)
            })
            .cloned();
        let placeholder = self.push(value);
        match cast {
            Some(sql_type) => format!("{}::{}", placeholder, sql_type),
            None => placeholder,
        }
    }

    fn finish(self, sql: String) -> BuiltQuery {
        BuiltQuery {
            sql,
            params: self.params,
        }
    }
}

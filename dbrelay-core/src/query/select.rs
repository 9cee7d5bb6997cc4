//! SELECT construction with ORDER BY / LIMIT / OFFSET handling.

use serde_json::Value;

use super::{BuiltQuery, ColumnTypes, ParamSink, WhereClause};
use crate::models::PlaceholderStyle;
use crate::validation::{IdentifierKind, validate_identifier};
use crate::{DbRelayError, Result};

/// Sort order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

impl OrderDirection {
    /// Returns the SQL order direction keyword.
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    fn parse(token: &str) -> Result<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(DbRelayError::invalid_arguments(format!(
                "Invalid sort direction: {}. Expected ASC or DESC.",
                token
            )))
        }
    }
}

/// Builder for `SELECT {columns|*} FROM {table} [WHERE] [ORDER BY] [LIMIT [OFFSET]]`.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    /// Empty means `*`
    columns: Vec<String>,
    filter: WhereClause,
    order_by: Vec<(String, OrderDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
    column_types: ColumnTypes,
}

impl SelectQuery {
    /// Starts a query against `table`.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` if the table name is not valid.
    pub fn new(table: &str) -> Result<Self> {
        validate_identifier(table, IdentifierKind::Table)?;
        Ok(Self {
            table: table.to_string(),
            columns: Vec::new(),
            filter: WhereClause::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            column_types: ColumnTypes::new(),
        })
    }

    /// Restricts the projection to the given columns.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` on the first bad column name.
    pub fn columns<I, S>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            let column = column.as_ref();
            validate_identifier(column, IdentifierKind::Column)?;
            self.columns.push(column.to_string());
        }
        Ok(self)
    }

    /// Parses a comma-separated column list; `*` or an empty string selects
    /// every column.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` on the first bad column name.
    pub fn select_list(self, list: &str) -> Result<Self> {
        let trimmed = list.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(self);
        }
        self.columns(trimmed.split(',').map(str::trim))
    }

    #[must_use]
    pub fn filter(mut self, filter: WhereClause) -> Self {
        self.filter = filter;
        self
    }

    /// Adds an ORDER BY term.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` if `column` is not a valid name.
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Result<Self> {
        validate_identifier(column, IdentifierKind::Column)?;
        self.order_by.push((column.to_string(), direction));
        Ok(self)
    }

    /// Parses `col [ASC|DESC], ...`; a missing direction means ascending.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` for a bad column and `InvalidArguments`
    /// for an unknown direction or trailing tokens.
    pub fn order_by_list(self, list: &str) -> Result<Self> {
        list.split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .try_fold(self, |query, term| {
                let mut tokens = term.split_whitespace();
                let column = tokens.next().unwrap_or_default();
                let direction = match tokens.next() {
                    Some(token) => OrderDirection::parse(token)?,
                    None => OrderDirection::Asc,
                };
                if let Some(extra) = tokens.next() {
                    return Err(DbRelayError::invalid_arguments(format!(
                        "Unexpected token '{}' in ORDER BY term '{}'",
                        extra, term
                    )));
                }
                query.order_by(column, direction)
            })
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets OFFSET; only emitted when a LIMIT is also present.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn column_types(mut self, column_types: ColumnTypes) -> Self {
        self.column_types = column_types;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Renders the statement. LIMIT and OFFSET are interpolated as integers.
    pub fn build(&self, style: PlaceholderStyle) -> BuiltQuery {
        let mut sink = ParamSink::typed(style, &self.column_types);
        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", projection, self.table);

        self.filter.append_to(&mut sql, &mut sink);

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction.to_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = self.limit.filter(|&limit| limit > 0) {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset.filter(|&offset| offset > 0) {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        sink.finish(sql)
    }
}

/// Coerces a LIMIT/OFFSET argument to a non-negative integer.
///
/// Accepts JSON integers, floats (truncated) and integer strings. `null`
/// means "not given".
///
/// # Errors
/// Fails with `InvalidArguments` for negative or non-numeric input.
pub fn coerce_integer(name: &str, value: &Value) -> Result<Option<u64>> {
    let invalid = || {
        DbRelayError::invalid_arguments(format!(
            "{} must be a non-negative integer, got {}",
            name, value
        ))
    };

    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(truncate_non_negative)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(truncate_non_negative))
        }
        _ => None,
    };

    parsed.map(Some).ok_or_else(invalid)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate_non_negative(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value < u64::MAX as f64).then(|| value.trunc() as u64)
}

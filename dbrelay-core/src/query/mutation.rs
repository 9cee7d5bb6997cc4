//! INSERT, UPDATE and DELETE construction.
//!
//! UPDATE and DELETE refuse to render without a WHERE clause and report
//! [`DbRelayError::UnsafeOperation`] instead of touching every row.

use serde_json::{Map, Value};

use super::{BuiltQuery, ColumnTypes, ParamSink, WhereClause};
use crate::models::PlaceholderStyle;
use crate::validation::{IdentifierKind, validate_identifier};
use crate::{DbRelayError, Result};

fn validated_assignments(data: &Map<String, Value>, verb: &str) -> Result<Vec<(String, Value)>> {
    if data.is_empty() {
        return Err(DbRelayError::invalid_arguments(format!(
            "Cannot {} with no values",
            verb
        )));
    }
    data.iter()
        .map(|(column, value)| {
            validate_identifier(column, IdentifierKind::Column)?;
            Ok((column.clone(), value.clone()))
        })
        .collect()
}

/// Builder for `INSERT INTO {table} (cols) VALUES (...)`.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: String,
    values: Vec<(String, Value)>,
    returning_all: bool,
    column_types: ColumnTypes,
}

impl InsertQuery {
    /// # Errors
    /// Fails with `InvalidIdentifier` for a bad table name, or
    /// `InvalidArguments` when `data` is empty.
    pub fn new(table: &str, data: &Map<String, Value>) -> Result<Self> {
        validate_identifier(table, IdentifierKind::Table)?;
        Ok(Self {
            table: table.to_string(),
            values: validated_assignments(data, "insert")?,
            returning_all: false,
            column_types: ColumnTypes::new(),
        })
    }

    /// Appends `RETURNING *` so drivers without a last-insert id can report
    /// the generated row.
    #[must_use]
    pub const fn returning_all(mut self) -> Self {
        self.returning_all = true;
        self
    }

    /// Casts text-bound values to their column types (numbered placeholders only).
    #[must_use]
    pub fn column_types(mut self, column_types: ColumnTypes) -> Self {
        self.column_types = column_types;
        self
    }

    pub fn build(&self, style: PlaceholderStyle) -> BuiltQuery {
        let mut sink = ParamSink::typed(style, &self.column_types);
        let columns: Vec<&str> = self.values.iter().map(|(column, _)| column.as_str()).collect();
        let placeholders: Vec<String> = self
            .values
            .iter()
            .map(|(column, value)| sink.push_for(column, value.clone()))
            .collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        if self.returning_all {
            sql.push_str(" RETURNING *");
        }
        sink.finish(sql)
    }
}

/// Builder for `UPDATE {table} SET ... WHERE ...`.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: String,
    assignments: Vec<(String, Value)>,
    filter: WhereClause,
    column_types: ColumnTypes,
}

impl UpdateQuery {
    /// # Errors
    /// Fails with `InvalidIdentifier` for a bad table or column name, or
    /// `InvalidArguments` when `data` is empty.
    pub fn new(table: &str, data: &Map<String, Value>) -> Result<Self> {
        validate_identifier(table, IdentifierKind::Table)?;
        Ok(Self {
            table: table.to_string(),
            assignments: validated_assignments(data, "update")?,
            filter: WhereClause::new(),
            column_types: ColumnTypes::new(),
        })
    }

    #[must_use]
    pub fn filter(mut self, filter: WhereClause) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn column_types(mut self, column_types: ColumnTypes) -> Self {
        self.column_types = column_types;
        self
    }

    /// # Errors
    /// Fails with `UnsafeOperation` when no WHERE condition was given.
    pub fn build(&self, style: PlaceholderStyle) -> Result<BuiltQuery> {
        if self.filter.is_empty() {
            return Err(DbRelayError::UnsafeOperation {
                operation: "UPDATE",
            });
        }

        let mut sink = ParamSink::typed(style, &self.column_types);
        let set_clause: Vec<String> = self
            .assignments
            .iter()
            .map(|(column, value)| format!("{} = {}", column, sink.push_for(column, value.clone())))
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.table, set_clause.join(", "));
        self.filter.append_to(&mut sql, &mut sink);
        Ok(sink.finish(sql))
    }
}

/// Builder for `DELETE FROM {table} WHERE ...`.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: String,
    filter: WhereClause,
    column_types: ColumnTypes,
}

impl DeleteQuery {
    /// # Errors
    /// Fails with `InvalidIdentifier` for a bad table name.
    pub fn new(table: &str) -> Result<Self> {
        validate_identifier(table, IdentifierKind::Table)?;
        Ok(Self {
            table: table.to_string(),
            filter: WhereClause::new(),
            column_types: ColumnTypes::new(),
        })
    }

    #[must_use]
    pub fn filter(mut self, filter: WhereClause) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn column_types(mut self, column_types: ColumnTypes) -> Self {
        self.column_types = column_types;
        self
    }

    /// # Errors
    /// Fails with `UnsafeOperation` when no WHERE condition was given.
    pub fn build(&self, style: PlaceholderStyle) -> Result<BuiltQuery> {
        if self.filter.is_empty() {
            return Err(DbRelayError::UnsafeOperation {
                operation: "DELETE",
            });
        }

        let mut sink = ParamSink::typed(style, &self.column_types);
        let mut sql = format!("DELETE FROM {}", self.table);
        self.filter.append_to(&mut sql, &mut sink);
        Ok(sink.finish(sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_insert_binds_values_in_column_order() {
        let query = InsertQuery::new("users", &map(json!({"name": "Alice", "age": 30})))
            .unwrap()
            .build(PlaceholderStyle::QuestionMark);
        assert_eq!(query.sql, "INSERT INTO users (name, age) VALUES (?, ?)");
        assert_eq!(query.params, vec![json!("Alice"), json!(30)]);
    }

    #[test]
    fn test_insert_returning_for_postgres() {
        let query = InsertQuery::new("users", &map(json!({"name": "Alice"})))
            .unwrap()
            .returning_all()
            .build(PlaceholderStyle::Numbered);
        assert_eq!(query.sql, "INSERT INTO users (name) VALUES ($1) RETURNING *");
    }

    #[test]
    fn test_insert_null_uses_keyword() {
        let query = InsertQuery::new("users", &map(json!({"name": "Alice", "bio": null, "age": 3})))
            .unwrap()
            .build(PlaceholderStyle::Numbered);
        assert_eq!(query.sql, "INSERT INTO users (name, bio, age) VALUES ($1, NULL, $2)");
        assert_eq!(query.params, vec![json!("Alice"), json!(3)]);
    }

    fn column_types(pairs: &[(&str, &str)]) -> ColumnTypes {
        pairs
            .iter()
            .map(|(column, sql_type)| (column.to_string(), sql_type.to_string()))
            .collect()
    }

    #[test]
    fn test_typed_columns_cast_text_values() {
        let types = column_types(&[
            ("id", "uuid"),
            ("seen_at", "timestamp with time zone"),
            ("tags", "jsonb"),
            ("age", "integer"),
        ]);
        let data = map(json!({
            "id": "5f0c1d9e-9a4e-4c4b-8f39-3d6b0a0c2f11",
            "seen_at": "2024-01-01T00:00:00Z",
            "tags": {"a": 1},
            "age": 3,
            "name": "Alice"
        }));
        let query = InsertQuery::new("users", &data)
            .unwrap()
            .column_types(types)
            .build(PlaceholderStyle::Numbered);
        assert_eq!(
            query.sql,
            "INSERT INTO users (id, seen_at, tags, age, name) VALUES \
             ($1::uuid, $2::timestamp with time zone, $3::jsonb, $4, $5)"
        );
        assert_eq!(query.params.len(), 5);
    }

    #[test]
    fn test_typed_columns_ignored_for_question_marks() {
        let query = InsertQuery::new("users", &map(json!({"id": "x"})))
            .unwrap()
            .column_types(column_types(&[("id", "uuid")]))
            .build(PlaceholderStyle::QuestionMark);
        assert_eq!(query.sql, "INSERT INTO users (id) VALUES (?)");
    }

    #[test]
    fn test_update_casts_set_and_where() {
        let filter = WhereClause::new()
            .eq("created_on", json!("2024-05-01"))
            .unwrap()
            .eq("users.id", json!("5f0c1d9e-9a4e-4c4b-8f39-3d6b0a0c2f11"))
            .unwrap();
        let query = UpdateQuery::new("users", &map(json!({"active": "true"})))
            .unwrap()
            .filter(filter)
            .column_types(column_types(&[("active", "boolean"), ("created_on", "date"), ("id", "uuid")]))
            .build(PlaceholderStyle::Numbered)
            .unwrap();
        assert_eq!(
            query.sql,
            "UPDATE users SET active = $1::boolean WHERE created_on = $2::date AND users.id = $3::uuid"
        );
    }

    #[test]
    fn test_insert_requires_values() {
        let error = InsertQuery::new("users", &Map::new()).unwrap_err();
        assert!(matches!(error, DbRelayError::InvalidArguments { .. }));
    }

    #[test]
    fn test_insert_rejects_bad_column() {
        let error = InsertQuery::new("users", &map(json!({"name) VALUES ('x'); --": 1}))).unwrap_err();
        assert!(matches!(error, DbRelayError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_update_numbering_spans_set_and_where() {
        let filter = WhereClause::new().eq("id", json!(42)).unwrap();
        let query = UpdateQuery::new("users", &map(json!({"name": "Bob", "age": 35})))
            .unwrap()
            .filter(filter)
            .build(PlaceholderStyle::Numbered)
            .unwrap();
        assert_eq!(query.sql, "UPDATE users SET name = $1, age = $2 WHERE id = $3");
        assert_eq!(query.params, vec![json!("Bob"), json!(35), json!(42)]);
    }

    #[test]
    fn test_update_can_set_null() {
        let filter = WhereClause::new().eq("id", json!(1)).unwrap();
        let query = UpdateQuery::new("users", &map(json!({"nickname": null})))
            .unwrap()
            .filter(filter)
            .build(PlaceholderStyle::QuestionMark)
            .unwrap();
        assert_eq!(query.sql, "UPDATE users SET nickname = NULL WHERE id = ?");
        assert_eq!(query.params, vec![json!(1)]);
    }

    #[test]
    fn test_update_without_where_is_unsafe() {
        let error = UpdateQuery::new("users", &map(json!({"name": "Bob"})))
            .unwrap()
            .build(PlaceholderStyle::QuestionMark)
            .unwrap_err();
        assert!(matches!(error, DbRelayError::UnsafeOperation { operation: "UPDATE" }));
    }

    #[test]
    fn test_delete_with_where() {
        let filter = WhereClause::new()
            .eq("id", json!(7))
            .unwrap()
            .eq("archived_at", Value::Null)
            .unwrap();
        let query = DeleteQuery::new("users")
            .unwrap()
            .filter(filter)
            .build(PlaceholderStyle::QuestionMark)
            .unwrap();
        assert_eq!(query.sql, "DELETE FROM users WHERE id = ? AND archived_at IS NULL");
        assert_eq!(query.params, vec![json!(7)]);
    }

    #[test]
    fn test_delete_without_where_is_unsafe() {
        let error = DeleteQuery::new("users")
            .unwrap()
            .build(PlaceholderStyle::QuestionMark)
            .unwrap_err();
        assert!(matches!(error, DbRelayError::UnsafeOperation { operation: "DELETE" }));
        assert!(error.to_string().starts_with("DELETE without WHERE clause"));
    }
}

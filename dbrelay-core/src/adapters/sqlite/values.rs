//! SQLite row decoding.
//!
//! SQLite is dynamically typed, so each value is decoded by trying the
//! storage classes in turn.

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _};

use crate::adapters::helpers::{encode_blob, float_value};
use crate::models::Row;

pub(super) fn row_to_json(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), column_value(row, column.ordinal())))
        .collect()
}

fn column_value(row: &SqliteRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(Value::Null, float_value);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(Value::Null, Value::String);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.map_or(Value::Null, |bytes| encode_blob(&bytes));
    }

    Value::Null
}

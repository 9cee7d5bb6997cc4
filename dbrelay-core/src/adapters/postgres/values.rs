//! PostgreSQL row decoding.

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::adapters::helpers::{decoded, encode_blob, float_value, naive_timestamp_value};
use crate::models::Row;

pub(super) fn row_to_json(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let value = column_value(row, column.ordinal(), column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}

fn column_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => decoded(row.try_get::<Option<bool>, _>(index), Value::Bool),
        "INT2" => decoded(row.try_get::<Option<i16>, _>(index), Value::from),
        "INT4" => decoded(row.try_get::<Option<i32>, _>(index), Value::from),
        "INT8" => decoded(row.try_get::<Option<i64>, _>(index), Value::from),
        "FLOAT4" => decoded(row.try_get::<Option<f32>, _>(index), |v| {
            float_value(f64::from(v))
        }),
        "FLOAT8" => decoded(row.try_get::<Option<f64>, _>(index), float_value),
        "NUMERIC" => decoded(row.try_get::<Option<rust_decimal::Decimal>, _>(index), |v| {
            Value::String(v.to_string())
        }),
        "UUID" => decoded(row.try_get::<Option<uuid::Uuid>, _>(index), |v| {
            Value::String(v.to_string())
        }),
        "JSON" | "JSONB" => decoded(row.try_get::<Option<Value>, _>(index), |v| v),
        "TIMESTAMPTZ" => decoded(
            row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index),
            |v| Value::String(v.to_rfc3339()),
        ),
        "TIMESTAMP" => decoded(
            row.try_get::<Option<chrono::NaiveDateTime>, _>(index),
            naive_timestamp_value,
        ),
        "DATE" => decoded(row.try_get::<Option<chrono::NaiveDate>, _>(index), |v| {
            Value::String(v.to_string())
        }),
        "TIME" => decoded(row.try_get::<Option<chrono::NaiveTime>, _>(index), |v| {
            Value::String(v.to_string())
        }),
        "BYTEA" => decoded(row.try_get::<Option<Vec<u8>>, _>(index), |v| encode_blob(&v)),
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(value) => value.map_or(Value::Null, Value::String),
            Err(_) => raw_text(row, index),
        },
    }
}

/// Enum and other text-encoded types sqlx has no `String` mapping for.
fn raw_text(row: &PgRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw
            .as_str()
            .map_or(Value::Null, |text| Value::String(text.to_string())),
        _ => Value::Null,
    }
}

//! MySQL row decoding.

use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row as _, TypeInfo};

use crate::adapters::helpers::{decoded, encode_blob, float_value, naive_timestamp_value};
use crate::models::Row;

pub(super) fn row_to_json(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let value = column_value(row, column.ordinal(), column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}

fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOLEAN" => decoded(row.try_get::<Option<bool>, _>(index), Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            decoded(row.try_get::<Option<i64>, _>(index), Value::from)
        }
        name if name.ends_with("UNSIGNED") => {
            decoded(row.try_get::<Option<u64>, _>(index), Value::from)
        }
        "YEAR" => decoded(row.try_get::<Option<u16>, _>(index), Value::from),
        "FLOAT" => decoded(row.try_get::<Option<f32>, _>(index), |v| {
            float_value(f64::from(v))
        }),
        "DOUBLE" => decoded(row.try_get::<Option<f64>, _>(index), float_value),
        "DECIMAL" => decoded(row.try_get::<Option<rust_decimal::Decimal>, _>(index), |v| {
            Value::String(v.to_string())
        }),
        "JSON" => decoded(row.try_get::<Option<Value>, _>(index), |v| v),
        "TIMESTAMP" => decoded(
            row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index),
            |v| Value::String(v.to_rfc3339()),
        ),
        "DATETIME" => decoded(
            row.try_get::<Option<chrono::NaiveDateTime>, _>(index),
            naive_timestamp_value,
        ),
        "DATE" => decoded(row.try_get::<Option<chrono::NaiveDate>, _>(index), |v| {
            Value::String(v.to_string())
        }),
        "TIME" => decoded(row.try_get::<Option<chrono::NaiveTime>, _>(index), |v| {
            Value::String(v.to_string())
        }),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            decoded(row.try_get::<Option<Vec<u8>>, _>(index), |v| encode_blob(&v))
        }
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(value) => value.map_or(Value::Null, Value::String),
            Err(_) => decoded(row.try_get::<Option<Vec<u8>>, _>(index), |v| encode_blob(&v)),
        },
    }
}

//! Parameter binding and value encoding shared by the sqlx adapters.

use base64::Engine;
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

/// Binds one JSON value to a sqlx query.
///
/// Scalars bind natively; arrays and objects bind as their JSON text.
pub(crate) fn bind_json<'q, DB>(
    query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    value: &'q Value,
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                query.bind(int)
            } else if let Some(float) = number.as_f64() {
                query.bind(float)
            } else {
                query.bind(number.to_string())
            }
        }
        Value::String(text) => query.bind(text.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

/// Prepares `sql` with every parameter bound in order.
pub(crate) fn prepare<'q, DB>(
    sql: &'q str,
    params: &'q [Value],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    params
        .iter()
        .fold(sqlx::query::<DB>(sql), |query, value| bind_json(query, value))
}

/// Encodes binary column data as `base64:<data>`.
pub(crate) fn encode_blob(bytes: &[u8]) -> Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Value::String(format!("base64:{}", encoded))
}

/// Non-finite floats have no JSON form and become `null`.
pub(crate) fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Lifts a decoded optional into JSON; decode failures and NULLs become `null`.
#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub(crate) fn decoded<T>(
    result: std::result::Result<Option<T>, sqlx::Error>,
    convert: impl FnOnce(T) -> Value,
) -> Value {
    match result {
        Ok(Some(value)) => convert(value),
        Ok(None) | Err(_) => Value::Null,
    }
}

#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub(crate) fn naive_timestamp_value(value: chrono::NaiveDateTime) -> Value {
    Value::String(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Escapes a value for use inside a single-quoted SQL literal.
#[cfg(feature = "sqlite")]
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

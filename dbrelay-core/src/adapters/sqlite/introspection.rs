//! Column and index metadata via SQLite PRAGMAs.
//!
//! A `schema.table` name targets an attached schema, e.g. `main.users`.

use sqlx::{Row, SqlitePool};

use crate::adapters::helpers::quote_literal;
use crate::models::{ColumnInfo, IndexInfo};
use crate::validation::split_qualified;
use crate::{DbRelayError, Result};

fn pragma(name: &str, schema: Option<&str>, argument: &str) -> String {
    match schema {
        Some(schema) => format!("PRAGMA {}.{}({})", schema, name, quote_literal(argument)),
        None => format!("PRAGMA {}({})", name, quote_literal(argument)),
    }
}

pub(super) async fn describe_table(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnInfo>> {
    let (schema, name) = split_qualified(table);
    let rows = sqlx::query(&pragma("table_info", schema, name))
        .fetch_all(pool)
        .await
        .map_err(DbRelayError::driver)?;

    rows.iter()
        .map(|row| {
            let data_type: String = row.try_get("type").unwrap_or_default();
            let not_null: i64 = row.try_get("notnull").map_err(DbRelayError::driver)?;
            let pk: i64 = row.try_get("pk").map_err(DbRelayError::driver)?;
            let is_rowid_alias = pk == 1 && data_type.eq_ignore_ascii_case("INTEGER");
            Ok(ColumnInfo {
                field: row.try_get("name").map_err(DbRelayError::driver)?,
                nullable: not_null == 0 && pk == 0,
                key: if pk > 0 { "PRI".to_string() } else { String::new() },
                default: row.try_get("dflt_value").unwrap_or(None),
                extra: if is_rowid_alias {
                    "auto_increment".to_string()
                } else {
                    String::new()
                },
                data_type,
            })
        })
        .collect()
}

pub(super) async fn table_indexes(pool: &SqlitePool, table: &str) -> Result<Vec<IndexInfo>> {
    let (schema, name) = split_qualified(table);
    let index_rows = sqlx::query(&pragma("index_list", schema, name))
        .fetch_all(pool)
        .await
        .map_err(DbRelayError::driver)?;

    let mut indexes = Vec::new();
    for index_row in &index_rows {
        let index_name: String = index_row.try_get("name").map_err(DbRelayError::driver)?;
        let unique: i64 = index_row.try_get("unique").map_err(DbRelayError::driver)?;
        let origin: String = index_row.try_get("origin").unwrap_or_default();

        let column_rows = sqlx::query(&pragma("index_info", schema, &index_name))
            .fetch_all(pool)
            .await
            .map_err(DbRelayError::driver)?;

        for column_row in &column_rows {
            // Expression index columns have no name
            let column: Option<String> = column_row.try_get("name").unwrap_or(None);
            indexes.push(IndexInfo {
                name: index_name.clone(),
                column: column.unwrap_or_default(),
                unique: unique != 0,
                index_type: match origin.as_str() {
                    "pk" => "PRIMARY".to_string(),
                    "u" => "UNIQUE".to_string(),
                    _ => "BTREE".to_string(),
                },
            });
        }
    }
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::pragma;

    #[test]
    fn test_pragma_quotes_argument() {
        assert_eq!(pragma("table_info", None, "users"), "PRAGMA table_info('users')");
        assert_eq!(
            pragma("index_info", Some("main"), "idx'odd"),
            "PRAGMA main.index_info('idx''odd')"
        );
    }
}

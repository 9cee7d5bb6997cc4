//! Column and index metadata for MySQL tables.
//!
//! A `schema.table` name is looked up in that schema; a bare name is looked
//! up in the connection's current database.

use sqlx::{MySqlPool, Row};

use crate::models::{ColumnInfo, IndexInfo};
use crate::validation::split_qualified;
use crate::{DbRelayError, Result};

const COLUMNS_QUERY: &str = r"
    SELECT
        CAST(COLUMN_NAME AS CHAR) AS field,
        CAST(COLUMN_TYPE AS CHAR) AS data_type,
        CAST(IS_NULLABLE AS CHAR) AS is_nullable,
        CAST(COLUMN_KEY AS CHAR) AS column_key,
        CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
        CAST(EXTRA AS CHAR) AS extra
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
      AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
";

const INDEXES_QUERY: &str = r"
    SELECT
        CAST(INDEX_NAME AS CHAR) AS index_name,
        CAST(COLUMN_NAME AS CHAR) AS column_name,
        CAST(NON_UNIQUE AS SIGNED) AS non_unique,
        CAST(INDEX_TYPE AS CHAR) AS index_type
    FROM information_schema.STATISTICS
    WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
      AND TABLE_NAME = ?
    ORDER BY INDEX_NAME, SEQ_IN_INDEX
";

pub(super) async fn describe_table(pool: &MySqlPool, table: &str) -> Result<Vec<ColumnInfo>> {
    let (schema, name) = split_qualified(table);
    let rows = sqlx::query(COLUMNS_QUERY)
        .bind(schema)
        .bind(name)
        .fetch_all(pool)
        .await
        .map_err(DbRelayError::driver)?;

    rows.iter()
        .map(|row| {
            let is_nullable: String = row.try_get("is_nullable").map_err(DbRelayError::driver)?;
            Ok(ColumnInfo {
                field: row.try_get("field").map_err(DbRelayError::driver)?,
                data_type: row.try_get("data_type").map_err(DbRelayError::driver)?,
                nullable: is_nullable == "YES",
                key: row.try_get("column_key").unwrap_or_default(),
                default: row.try_get("column_default").map_err(DbRelayError::driver)?,
                extra: row.try_get("extra").unwrap_or_default(),
            })
        })
        .collect()
}

pub(super) async fn table_indexes(pool: &MySqlPool, table: &str) -> Result<Vec<IndexInfo>> {
    let (schema, name) = split_qualified(table);
    let rows = sqlx::query(INDEXES_QUERY)
        .bind(schema)
        .bind(name)
        .fetch_all(pool)
        .await
        .map_err(DbRelayError::driver)?;

    rows.iter()
        .map(|row| {
            let non_unique: i64 = row.try_get("non_unique").map_err(DbRelayError::driver)?;
            Ok(IndexInfo {
                name: row.try_get("index_name").map_err(DbRelayError::driver)?,
                column: row.try_get("column_name").unwrap_or_default(),
                unique: non_unique == 0,
                index_type: row.try_get("index_type").unwrap_or_default(),
            })
        })
        .collect()
}

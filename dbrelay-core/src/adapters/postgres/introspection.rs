//! Column and index metadata for PostgreSQL tables.
//!
//! A `schema.table` name is looked up in that schema; a bare name is looked
//! up in `current_schema()`.
//!
//! Enum, domain and array columns report their qualified type name instead of
//! `USER-DEFINED` / `ARRAY`, so the type can be used in a cast.

use sqlx::{PgPool, Row};

use crate::models::{ColumnInfo, IndexInfo};
use crate::validation::split_qualified;
use crate::{DbRelayError, Result};

const COLUMNS_QUERY: &str = r"
    SELECT
        c.column_name::text AS field,
        CASE
            WHEN c.data_type IN ('USER-DEFINED', 'ARRAY')
                THEN format('%I.%I', c.udt_schema, c.udt_name)
            ELSE c.data_type::text
        END AS data_type,
        c.is_nullable::text AS is_nullable,
        c.column_default::text AS column_default,
        c.is_identity::text AS is_identity,
        CASE WHEN pk.column_name IS NOT NULL THEN 'PRI' ELSE '' END AS column_key
    FROM information_schema.columns c
    LEFT JOIN (
        SELECT kcu.table_schema, kcu.table_name, kcu.column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON tc.constraint_name = kcu.constraint_name
         AND tc.table_schema = kcu.table_schema
         AND tc.table_name = kcu.table_name
        WHERE tc.constraint_type = 'PRIMARY KEY'
    ) pk
      ON pk.table_schema = c.table_schema
     AND pk.table_name = c.table_name
     AND pk.column_name = c.column_name
    WHERE c.table_name = $1
      AND c.table_schema = COALESCE($2, current_schema())
    ORDER BY c.ordinal_position
";

const INDEXES_QUERY: &str = r"
    SELECT
        i.relname::text AS index_name,
        a.attname::text AS column_name,
        ix.indisunique AS is_unique,
        am.amname::text AS index_type
    FROM pg_index ix
    JOIN pg_class t ON t.oid = ix.indrelid
    JOIN pg_class i ON i.oid = ix.indexrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_am am ON am.oid = i.relam
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
    WHERE t.relname = $1
      AND n.nspname = COALESCE($2, current_schema())
    ORDER BY i.relname, array_position(ix.indkey, a.attnum)
";

fn column_extra(default: Option<&str>, is_identity: &str) -> String {
    if is_identity == "YES" {
        "identity".to_string()
    } else if default.is_some_and(|d| d.starts_with("nextval(")) {
        "auto_increment".to_string()
    } else {
        String::new()
    }
}

pub(super) async fn describe_table(pool: &PgPool, table: &str) -> Result<Vec<ColumnInfo>> {
    let (schema, name) = split_qualified(table);
    let rows = sqlx::query(COLUMNS_QUERY)
        .bind(name)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(DbRelayError::driver)?;

    rows.iter()
        .map(|row| {
            let default: Option<String> = row.try_get("column_default").map_err(DbRelayError::driver)?;
            let is_identity: Option<String> = row.try_get("is_identity").map_err(DbRelayError::driver)?;
            let is_nullable: String = row.try_get("is_nullable").map_err(DbRelayError::driver)?;
            Ok(ColumnInfo {
                field: row.try_get("field").map_err(DbRelayError::driver)?,
                data_type: row.try_get("data_type").map_err(DbRelayError::driver)?,
                nullable: is_nullable == "YES",
                key: row.try_get("column_key").map_err(DbRelayError::driver)?,
                extra: column_extra(default.as_deref(), is_identity.as_deref().unwrap_or("NO")),
                default,
            })
        })
        .collect()
}

pub(super) async fn table_indexes(pool: &PgPool, table: &str) -> Result<Vec<IndexInfo>> {
    let (schema, name) = split_qualified(table);
    let rows = sqlx::query(INDEXES_QUERY)
        .bind(name)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(DbRelayError::driver)?;

    rows.iter()
        .map(|row| {
            Ok(IndexInfo {
                name: row.try_get("index_name").map_err(DbRelayError::driver)?,
                column: row.try_get("column_name").map_err(DbRelayError::driver)?,
                unique: row.try_get("is_unique").map_err(DbRelayError::driver)?,
                index_type: row.try_get("index_type").map_err(DbRelayError::driver)?,
            })
        })
        .collect()
}

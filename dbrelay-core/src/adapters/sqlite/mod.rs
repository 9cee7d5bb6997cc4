//! SQLite adapter.
//!
//! # Module Structure
//! - `connection`: Pool creation for file and in-memory databases
//! - `introspection`: `PRAGMA table_info` / `index_list` / `index_info`
//! - `values`: Row decoding into JSON
//!
//! # SQLite-Specific Behaviour
//! - `database` is a file path, a `sqlite://` URL or `:memory:`
//! - In-memory databases use a single pooled connection so every statement
//!   sees the same data

mod connection;
mod introspection;
mod values;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

use super::helpers::prepare;
use super::{ConnectionConfig, DatabaseConnection};
use crate::models::{ColumnInfo, Driver, ExecutionSummary, IndexInfo, Row};
use crate::query::inserts_rows;
use crate::{DbRelayError, Result};

/// SQLite connection pool with normalized results.
pub struct SqliteConnection {
    pool: SqlitePool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("target", &self.config.to_string())
            .field("is_in_memory", &self.config.is_in_memory())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(params = params.len(), "sqlite fetch: {}", sql);
        let rows = prepare::<sqlx::Sqlite>(sql, params)
            .fetch_all(&self.pool)
            .await
            .map_err(DbRelayError::driver)?;
        Ok(rows.iter().map(values::row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecutionSummary> {
        debug!(params = params.len(), "sqlite execute: {}", sql);
        let result = prepare::<sqlx::Sqlite>(sql, params)
            .execute(&self.pool)
            .await
            .map_err(DbRelayError::driver)?;
        let rows_affected = result.rows_affected();
        Ok(ExecutionSummary {
            rows_affected,
            last_insert_id: (rows_affected > 0 && inserts_rows(sql))
                .then(|| result.last_insert_rowid()),
        })
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        introspection::describe_table(&self.pool, table).await
    }

    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        introspection::table_indexes(&self.pool, table).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

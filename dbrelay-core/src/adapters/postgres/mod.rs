//! PostgreSQL adapter.
//!
//! # Module Structure
//! - `connection`: Pool creation and session settings
//! - `introspection`: Column and index metadata via `information_schema` / `pg_catalog`
//! - `values`: Row decoding into JSON
//!
//! Builder output uses `$n` placeholders for this driver. Inserts append
//! `RETURNING *` because PostgreSQL has no last-insert id.

mod connection;
mod introspection;
mod values;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use super::helpers::prepare;
use super::{ConnectionConfig, DatabaseConnection};
use crate::models::{ColumnInfo, Driver, ExecutionSummary, IndexInfo, Row};
use crate::{DbRelayError, Result};

/// PostgreSQL connection pool with normalized results.
pub struct PostgresConnection {
    pool: PgPool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("target", &self.config.to_string())
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    fn driver(&self) -> Driver {
        Driver::Postgres
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(params = params.len(), "postgres fetch: {}", sql);
        let rows = prepare::<sqlx::Postgres>(sql, params)
            .fetch_all(&self.pool)
            .await
            .map_err(DbRelayError::driver)?;
        Ok(rows.iter().map(values::row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecutionSummary> {
        debug!(params = params.len(), "postgres execute: {}", sql);
        let result = prepare::<sqlx::Postgres>(sql, params)
            .execute(&self.pool)
            .await
            .map_err(DbRelayError::driver)?;
        Ok(ExecutionSummary {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
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

//! MySQL / MariaDB adapter.
//!
//! # Module Structure
//! - `connection`: Pool creation and session settings
//! - `introspection`: Column and index metadata via `information_schema`
//! - `values`: Row decoding into JSON
//!
//! `information_schema` text columns are cast to `CHAR` because MySQL 8
//! reports several of them as binary strings.

mod connection;
mod introspection;
mod values;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::debug;

use super::helpers::prepare;
use super::{ConnectionConfig, DatabaseConnection};
use crate::models::{ColumnInfo, Driver, ExecutionSummary, IndexInfo, Row};
use crate::query::inserts_rows;
use crate::{DbRelayError, Result};

/// MySQL connection pool with normalized results.
pub struct MySqlConnection {
    pool: MySqlPool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("target", &self.config.to_string())
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseConnection for MySqlConnection {
    fn driver(&self) -> Driver {
        Driver::Mysql
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(params = params.len(), "mysql fetch: {}", sql);
        let rows = prepare::<sqlx::MySql>(sql, params)
            .fetch_all(&self.pool)
            .await
            .map_err(DbRelayError::driver)?;
        Ok(rows.iter().map(values::row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecutionSummary> {
        debug!(params = params.len(), "mysql execute: {}", sql);
        let result = prepare::<sqlx::MySql>(sql, params)
            .execute(&self.pool)
            .await
            .map_err(DbRelayError::driver)?;
        let last_insert_id = i64::try_from(result.last_insert_id())
            .ok()
            .filter(|id| *id > 0 && inserts_rows(sql));
        Ok(ExecutionSummary {
            rows_affected: result.rows_affected(),
            last_insert_id,
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

//! Database adapter traits and the driver-dispatching connection factory.
//!
//! Adapters normalize each driver's result shapes at this boundary: callers
//! see rows as ordered JSON objects, statement outcomes as an
//! [`ExecutionSummary`], and introspection as [`ColumnInfo`] / [`IndexInfo`].
//!
//! # Module Structure
//! - `config`: Connection settings (never holds the password)
//! - `helpers`: Parameter binding and value encoding shared by the drivers
//! - Driver modules (`postgres`, `mysql`, `sqlite`), each behind its cargo feature

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::models::{ColumnInfo, Driver, ExecutionSummary, IndexInfo, Row};
use crate::security::Credentials;

pub mod config;
#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
mod helpers;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgresql")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::ConnectionConfig;

/// A live database connection (usually a pool) with results normalized to
/// driver-neutral shapes.
///
/// # Object Safety
/// This trait is object-safe; the connection manager stores handles as
/// `Arc<dyn DatabaseConnection>`.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Driver behind this connection
    fn driver(&self) -> Driver;

    /// Runs a statement and returns its rows.
    ///
    /// # Errors
    /// Returns a driver error if the statement fails.
    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Runs a statement that does not return rows.
    ///
    /// # Errors
    /// Returns a driver error if the statement fails.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecutionSummary>;

    /// Column metadata for `table`, in column order. An unknown table yields
    /// an empty list.
    ///
    /// # Errors
    /// Returns a driver error if introspection fails.
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Index metadata for `table`, one entry per indexed column.
    ///
    /// # Errors
    /// Returns a driver error if introspection fails.
    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexInfo>>;

    /// Closes the connection gracefully.
    async fn close(&self);
}

/// Opens connections; the production implementation is [`SqlxConnectionFactory`].
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// # Errors
    /// Returns a connection error if the database cannot be reached.
    async fn connect(
        &self,
        config: &ConnectionConfig,
        credentials: &Credentials,
    ) -> Result<Arc<dyn DatabaseConnection>>;
}

/// Connection factory backed by `sqlx` pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxConnectionFactory;

#[async_trait]
impl ConnectionFactory for SqlxConnectionFactory {
    #[allow(unused_variables)]
    async fn connect(
        &self,
        config: &ConnectionConfig,
        credentials: &Credentials,
    ) -> Result<Arc<dyn DatabaseConnection>> {
        match config.driver {
            #[cfg(feature = "postgresql")]
            Driver::Postgres => {
                let connection = postgres::PostgresConnection::connect(config, credentials).await?;
                Ok(Arc::new(connection))
            }
            #[cfg(not(feature = "postgresql"))]
            Driver::Postgres => Err(crate::error::DbRelayError::unsupported_feature(
                "PostgreSQL adapter",
                "Compile with --features postgresql to enable PostgreSQL support",
            )),
            #[cfg(feature = "mysql")]
            Driver::Mysql => {
                let connection = mysql::MySqlConnection::connect(config, credentials).await?;
                Ok(Arc::new(connection))
            }
            #[cfg(not(feature = "mysql"))]
            Driver::Mysql => Err(crate::error::DbRelayError::unsupported_feature(
                "MySQL adapter",
                "Compile with --features mysql to enable MySQL support",
            )),
            #[cfg(feature = "sqlite")]
            Driver::Sqlite => {
                let connection = sqlite::SqliteConnection::connect(config).await?;
                Ok(Arc::new(connection))
            }
            #[cfg(not(feature = "sqlite"))]
            Driver::Sqlite => Err(crate::error::DbRelayError::unsupported_feature(
                "SQLite adapter",
                "Compile with --features sqlite to enable SQLite support",
            )),
        }
    }
}

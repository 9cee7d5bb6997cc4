//! PostgreSQL pool creation.

use sqlx::Executor;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

use super::PostgresConnection;
use crate::Result;
use crate::adapters::ConnectionConfig;
use crate::error::DbRelayError;
use crate::security::Credentials;

impl PostgresConnection {
    /// Opens a pool and verifies that at least one connection succeeds.
    ///
    /// # Errors
    /// Returns a connection error (target shown without credentials) if the
    /// server cannot be reached or rejects the login.
    pub async fn connect(config: &ConnectionConfig, credentials: &Credentials) -> Result<Self> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .database(&config.database)
            .application_name(concat!("dbrelay-", env!("CARGO_PKG_VERSION")));
        if let Some(port) = config.port {
            options = options.port(port);
        }
        if let Some(username) = credentials.username() {
            options = options.username(username);
        }
        if let Some(password) = credentials.password() {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.min(100))
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // Timestamps are reported in UTC
                    conn.execute("SET timezone = 'UTC'").await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| DbRelayError::connection_failed(config.to_string(), e))?;

        info!("Connected to {}", config);
        Ok(Self {
            pool,
            config: config.clone(),
        })
    }
}

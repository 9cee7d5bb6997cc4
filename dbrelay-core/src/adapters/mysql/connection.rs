//! MySQL pool creation.

use sqlx::Executor;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use tracing::info;

use super::MySqlConnection;
use crate::Result;
use crate::adapters::ConnectionConfig;
use crate::error::DbRelayError;
use crate::security::Credentials;

impl MySqlConnection {
    /// Opens a pool and verifies that at least one connection succeeds.
    ///
    /// # Errors
    /// Returns a connection error (target shown without credentials) if the
    /// server cannot be reached or rejects the login.
    pub async fn connect(config: &ConnectionConfig, credentials: &Credentials) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .database(&config.database);
        if let Some(port) = config.port {
            options = options.port(port);
        }
        if let Some(username) = credentials.username() {
            options = options.username(username);
        }
        if let Some(password) = credentials.password() {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections.min(100))
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // Timestamps are reported in UTC
                    conn.execute("SET time_zone = '+00:00'").await?;
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

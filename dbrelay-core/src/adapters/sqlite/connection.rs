//! SQLite pool creation.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use super::SqliteConnection;
use crate::Result;
use crate::adapters::ConnectionConfig;
use crate::error::DbRelayError;

/// Builds connect options from a path, `sqlite://` URL or `:memory:`.
///
/// File databases are created when missing.
pub(super) fn connect_options(database: &str) -> Result<SqliteConnectOptions> {
    let options = if database == ":memory:" {
        SqliteConnectOptions::from_str("sqlite::memory:")
    } else if database.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database)
    } else {
        Ok(SqliteConnectOptions::new().filename(database))
    };

    options
        .map(|options| options.create_if_missing(true))
        .map_err(|e| {
            DbRelayError::configuration(format!("Invalid SQLite database '{}': {}", database, e))
        })
}

impl SqliteConnection {
    /// Opens the database file (or in-memory database).
    ///
    /// # Errors
    /// Returns a connection error if the file cannot be opened or created.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = connect_options(&config.database)?;

        let pool_options = if config.is_in_memory() {
            // Each in-memory connection is a separate database
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.min(100))
        };

        let pool = pool_options
            .acquire_timeout(config.connect_timeout)
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

#[cfg(test)]
mod tests {
    use super::connect_options;

    #[test]
    fn test_connect_options_accepts_supported_forms() {
        assert!(connect_options(":memory:").is_ok());
        assert!(connect_options("sqlite::memory:").is_ok());
        assert!(connect_options("./data/app.db").is_ok());
        assert!(connect_options("sqlite://./data/app.db").is_ok());
    }
}

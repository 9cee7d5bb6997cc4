//! Database connection configuration.

use std::time::Duration;

use serde::Serialize;

use crate::DbRelayError;
use crate::models::Driver;

/// Settings for opening a connection.
///
/// # Security
/// This struct intentionally does NOT store passwords. Credentials travel
/// separately in [`crate::security::Credentials`].
///
/// # Example
/// ```rust
/// use dbrelay_core::adapters::ConnectionConfig;
/// use dbrelay_core::Driver;
///
/// let config = ConnectionConfig::new(Driver::Postgres, "app".to_string())
///     .with_host("db.internal".to_string())
///     .with_port(5432)
///     .with_username("admin".to_string());
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.to_string(), "postgres://db.internal:5432/app");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub driver: Driver,
    /// Database host address (ignored by SQLite)
    pub host: String,
    pub port: Option<u16>,
    /// Database name, or file path / `:memory:` for SQLite
    pub database: String,
    /// Optional username (password handled separately)
    pub username: Option<String>,
    /// How long to wait for the first pooled connection
    pub connect_timeout: Duration,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.driver {
            Driver::Sqlite => write!(f, "sqlite://{}", self.database),
            driver => write!(
                f,
                "{}://{}{}/{}",
                driver.as_str(),
                self.host,
                self.port.map_or_else(String::new, |p| format!(":{}", p)),
                self.database
            ),
        }
        // Intentionally omit username and never include credentials
    }
}

impl ConnectionConfig {
    /// Creates a config with default pool settings.
    pub fn new(driver: Driver, database: String) -> Self {
        Self {
            driver,
            host: crate::config::DEFAULT_HOST.to_string(),
            port: driver.default_port(),
            database,
            username: None,
            connect_timeout: Duration::from_secs(30),
            max_connections: 10,
        }
    }

    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.database.is_empty() {
            return Err(DbRelayError::configuration("database cannot be empty"));
        }

        if self.driver != Driver::Sqlite && self.host.is_empty() {
            return Err(DbRelayError::configuration("host cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(DbRelayError::configuration("port must be greater than 0"));
        }

        if self.max_connections == 0 {
            return Err(DbRelayError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(DbRelayError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(DbRelayError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// True when a SQLite database lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.driver == Driver::Sqlite
            && (self.database.contains(":memory:") || self.database.contains("mode=memory"))
    }

    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::new(Driver::Mysql, "app".to_string());
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, Some(3306));
        assert_eq!(config.max_connections, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_config_validation() {
        let base = ConnectionConfig::new(Driver::Postgres, "app".to_string());

        assert!(base.clone().with_host(String::new()).validate().is_err());
        assert!(base.clone().with_port(0).validate().is_err());
        assert!(base.clone().with_max_connections(0).validate().is_err());
        assert!(base.clone().with_max_connections(101).validate().is_err());

        let sqlite = ConnectionConfig::new(Driver::Sqlite, ":memory:".to_string())
            .with_host(String::new());
        assert!(sqlite.validate().is_ok());
        assert!(sqlite.is_in_memory());
    }

    #[test]
    fn test_display_omits_username() {
        let config = ConnectionConfig::new(Driver::Postgres, "app".to_string())
            .with_username("admin".to_string());
        let shown = config.to_string();
        assert_eq!(shown, "postgres://localhost:5432/app");
        assert!(!shown.contains("admin"));
    }
}

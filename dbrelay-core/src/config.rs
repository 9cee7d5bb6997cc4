//! Database settings supplied by callers and by the environment.
//!
//! A [`DbConfig`] is a partial description of a database: every field is
//! optional. Tool arguments produce one, the process environment produces
//! another (`DB_DRIVER`, `DB_HOST`, `DB_PORT`, `DB_DATABASE`, `DB_USER`,
//! `DB_PASSWORD`), and [`DbConfig::merged_over`] lets explicit values win
//! field by field before [`DbConfig::resolve`] turns the result into a
//! concrete [`ConnectionConfig`] plus [`Credentials`].

use serde::Deserialize;

use crate::adapters::ConnectionConfig;
use crate::models::Driver;
use crate::security::Credentials;
use crate::{DbRelayError, Result};

/// Host used when neither the caller nor the environment names one
pub const DEFAULT_HOST: &str = "localhost";

/// Partial database settings.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfig {
    pub driver: Option<Driver>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

impl DbConfig {
    /// Fills every field left empty in `self` from `defaults`.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        fn pick<T: Clone>(explicit: Option<&T>, fallback: Option<&T>) -> Option<T> {
            explicit.or(fallback).cloned()
        }

        Self {
            driver: self.driver.or(defaults.driver),
            host: pick(self.host.as_ref(), defaults.host.as_ref()),
            port: self.port.or(defaults.port),
            database: pick(self.database.as_ref(), defaults.database.as_ref()),
            user: pick(self.user.as_ref(), defaults.user.as_ref()),
            password: pick(self.password.as_ref(), defaults.password.as_ref()),
        }
    }

    /// Produces connection settings and credentials.
    ///
    /// # Errors
    /// Returns a configuration error when the driver or database is missing.
    pub fn resolve(&self) -> Result<(ConnectionConfig, Credentials)> {
        let driver = self.driver.ok_or_else(|| {
            DbRelayError::configuration("Database driver is required (driver or DB_DRIVER)")
        })?;
        let database = self
            .database
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                DbRelayError::configuration("Database name is required (database or DB_DATABASE)")
            })?;

        let mut config = ConnectionConfig::new(driver, database.to_string())
            .with_host(self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()));
        if let Some(port) = self.port.or_else(|| driver.default_port()) {
            config = config.with_port(port);
        }
        if let Some(user) = &self.user {
            config = config.with_username(user.clone());
        }
        config.validate()?;

        let credentials = Credentials::new(self.user.clone().unwrap_or_default(), self.password.clone());
        Ok((config, credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env_defaults() -> DbConfig {
        DbConfig {
            driver: Some(Driver::Mysql),
            host: Some("db.internal".to_string()),
            port: Some(3307),
            database: Some("app".to_string()),
            user: Some("svc".to_string()),
            password: Some("env-secret".to_string()),
        }
    }

    #[test]
    fn test_explicit_fields_win() {
        let explicit: DbConfig =
            serde_json::from_value(json!({"database": "reports", "port": 3310})).unwrap();
        let merged = explicit.merged_over(&env_defaults());
        assert_eq!(merged.database.as_deref(), Some("reports"));
        assert_eq!(merged.port, Some(3310));
        assert_eq!(merged.host.as_deref(), Some("db.internal"));
        assert_eq!(merged.password.as_deref(), Some("env-secret"));
    }

    #[test]
    fn test_resolve_applies_driver_defaults() {
        let config = DbConfig {
            driver: Some(Driver::Postgres),
            database: Some("app".to_string()),
            ..Default::default()
        };
        let (connection, credentials) = config.resolve().unwrap();
        assert_eq!(connection.host, "localhost");
        assert_eq!(connection.port, Some(5432));
        assert_eq!(credentials.username(), None);
    }

    #[test]
    fn test_resolve_requires_driver_and_database() {
        let missing_driver = DbConfig {
            database: Some("app".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_driver.resolve(),
            Err(DbRelayError::Configuration { .. })
        ));

        let missing_database = DbConfig {
            driver: Some(Driver::Sqlite),
            database: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_database.resolve(),
            Err(DbRelayError::Configuration { .. })
        ));
    }

    #[test]
    fn test_debug_never_shows_password() {
        let debug = format!("{:?}", env_defaults());
        assert!(!debug.contains("env-secret"));
        assert!(debug.contains("db.internal"));
    }
}

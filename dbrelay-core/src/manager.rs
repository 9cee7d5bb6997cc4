//! Named database connections and the active-connection pointer.
//!
//! A [`ConnectionManager`] is an explicit value rather than process-wide
//! state: handlers receive it by reference, and tests build as many
//! independent managers as they like. It owns the [`SchemaCache`] because
//! cached schema is only meaningful for the connection it was read through.
//!
//! # Lifecycle
//! A name moves from absent to connected through [`ConnectionManager::connect`]
//! and back to absent through [`ConnectionManager::disconnect`] or
//! [`ConnectionManager::disconnect_all`]. Connecting a name that is already
//! registered hands back the existing handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::adapters::{ConnectionConfig, ConnectionFactory, DatabaseConnection};
use crate::cache::SchemaCache;
use crate::config::DbConfig;
use crate::models::Driver;
use crate::security::Credentials;
use crate::{DbRelayError, Result};

/// Name used for connections opened implicitly from a `dbConfig` argument
pub const DEFAULT_CONNECTION_NAME: &str = "default";

struct ConnectionRecord {
    name: String,
    connection: Arc<dyn DatabaseConnection>,
    config: ConnectionConfig,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct ManagerState {
    records: Vec<ConnectionRecord>,
    active: Option<String>,
}

impl ManagerState {
    fn find(&self, name: &str) -> Option<&ConnectionRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    fn names(&self) -> Vec<String> {
        self.records.iter().map(|record| record.name.clone()).collect()
    }

    fn not_found(&self, name: &str) -> DbRelayError {
        DbRelayError::ConnectionNotFound {
            name: name.to_string(),
            available: self.names(),
        }
    }
}

/// A connection picked for one operation.
#[derive(Clone)]
pub struct ResolvedConnection {
    pub name: String,
    pub connection: Arc<dyn DatabaseConnection>,
}

impl std::fmt::Debug for ResolvedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConnection")
            .field("name", &self.name)
            .field("driver", &self.connection.driver())
            .finish()
    }
}

/// Result of [`ConnectionManager::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub name: String,
    pub driver: Driver,
    pub database: String,
    pub is_active: bool,
    pub total_connections: usize,
    /// True when the name was already connected and no new handle was opened
    pub reused: bool,
}

/// Public description of a registered connection. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub name: String,
    pub driver: Driver,
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
    pub user: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Registry of live connections.
pub struct ConnectionManager {
    factory: Arc<dyn ConnectionFactory>,
    state: RwLock<ManagerState>,
    cache: SchemaCache,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self::with_cache(factory, SchemaCache::default())
    }

    pub fn with_cache(factory: Arc<dyn ConnectionFactory>, cache: SchemaCache) -> Self {
        Self {
            factory,
            state: RwLock::new(ManagerState::default()),
            cache,
        }
    }

    pub const fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Opens and registers a connection under `name`.
    ///
    /// The first registered connection becomes active, as does any connection
    /// connected with `set_active`. Reconnecting a registered name returns the
    /// existing handle; if another caller registers the same name while this
    /// one is still connecting, the freshly opened handle is closed again.
    ///
    /// # Errors
    /// Fails with `InvalidArguments` for a blank name, or a connection error
    /// from the factory.
    pub async fn connect(
        &self,
        name: &str,
        config: ConnectionConfig,
        credentials: &Credentials,
        set_active: bool,
    ) -> Result<ConnectOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbRelayError::invalid_arguments("connectionName is required"));
        }

        {
            let mut state = self.state.write().await;
            if state.find(name).is_some() {
                debug!("Connection '{}' already registered, reusing it", name);
                return Self::register_outcome(&mut state, name, set_active, true);
            }
        }

        info!("Connecting '{}' to {}", name, config);
        let connection = self.factory.connect(&config, credentials).await?;

        let mut state = self.state.write().await;
        if state.find(name).is_some() {
            drop(state);
            warn!("Connection '{}' was registered concurrently; closing duplicate", name);
            connection.close().await;
            let mut state = self.state.write().await;
            return Self::register_outcome(&mut state, name, set_active, true);
        }

        state.records.push(ConnectionRecord {
            name: name.to_string(),
            connection,
            config,
            created_at: Utc::now(),
        });
        Self::register_outcome(&mut state, name, set_active, false)
    }

    fn register_outcome(
        state: &mut ManagerState,
        name: &str,
        set_active: bool,
        reused: bool,
    ) -> Result<ConnectOutcome> {
        let (driver, database) = state
            .find(name)
            .map(|record| (record.config.driver, record.config.database.clone()))
            .ok_or_else(|| state.not_found(name))?;
        if set_active || state.active.is_none() {
            state.active = Some(name.to_string());
        }
        Ok(ConnectOutcome {
            name: name.to_string(),
            driver,
            database,
            is_active: state.active.as_deref() == Some(name),
            total_connections: state.records.len(),
            reused,
        })
    }

    /// Makes `name` the active connection.
    ///
    /// # Errors
    /// Fails with `ConnectionNotFound` if `name` is not registered.
    pub async fn set_active(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.find(name).is_none() {
            return Err(state.not_found(name));
        }
        state.active = Some(name.to_string());
        Ok(())
    }

    pub async fn active_name(&self) -> Option<String> {
        self.state.read().await.active.clone()
    }

    /// Closes and forgets `name`, then clears the schema cache.
    ///
    /// When the active connection goes away, the first remaining connection
    /// becomes active.
    ///
    /// # Errors
    /// Fails with `ConnectionNotFound` if `name` is not registered.
    pub async fn disconnect(&self, name: &str) -> Result<()> {
        let record = {
            let mut state = self.state.write().await;
            let Some(position) = state.records.iter().position(|record| record.name == name)
            else {
                return Err(state.not_found(name));
            };
            let record = state.records.remove(position);
            if state.active.as_deref() == Some(name) {
                state.active = state.records.first().map(|next| next.name.clone());
            }
            record
        };

        record.connection.close().await;
        self.cache.invalidate(None);
        info!("Disconnected '{}'", record.name);
        Ok(())
    }

    /// Closes every connection and returns how many there were.
    pub async fn disconnect_all(&self) -> usize {
        let records = {
            let mut state = self.state.write().await;
            state.active = None;
            std::mem::take(&mut state.records)
        };

        futures::future::join_all(records.iter().map(|record| record.connection.close())).await;
        self.cache.invalidate(None);
        if !records.is_empty() {
            info!("Closed {} connection(s)", records.len());
        }
        records.len()
    }

    /// Returns the named connection, or the active one when `name` is `None`.
    ///
    /// # Errors
    /// Fails with `ConnectionNotFound` or `NoActiveConnection`.
    pub async fn resolve(&self, name: Option<&str>) -> Result<ResolvedConnection> {
        let state = self.state.read().await;
        let name = match name {
            Some(name) => name,
            None => state
                .active
                .as_deref()
                .ok_or(DbRelayError::NoActiveConnection)?,
        };
        state
            .find(name)
            .map(|record| ResolvedConnection {
                name: record.name.clone(),
                connection: Arc::clone(&record.connection),
            })
            .ok_or_else(|| state.not_found(name))
    }

    /// Resolves like [`Self::resolve`], but with no name and no active
    /// connection a supplied `db_config` (merged over `defaults`) is connected
    /// under [`DEFAULT_CONNECTION_NAME`] and used.
    ///
    /// # Errors
    /// Resolution errors as for [`Self::resolve`], configuration errors for an
    /// incomplete `db_config`, or a connection error.
    pub async fn resolve_or_connect(
        &self,
        name: Option<&str>,
        db_config: Option<&DbConfig>,
        defaults: &DbConfig,
    ) -> Result<ResolvedConnection> {
        let implicit = match (name, db_config) {
            (None, Some(db_config)) if self.active_name().await.is_none() => db_config,
            _ => return self.resolve(name).await,
        };

        let (config, credentials) = implicit.merged_over(defaults).resolve()?;
        self.connect(DEFAULT_CONNECTION_NAME, config, &credentials, false)
            .await?;
        self.resolve(Some(DEFAULT_CONNECTION_NAME)).await
    }

    /// Registered connections in connection order.
    pub async fn list_connections(&self) -> Vec<ConnectionSummary> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .map(|record| ConnectionSummary {
                name: record.name.clone(),
                driver: record.config.driver,
                host: record.config.host.clone(),
                port: record.config.port,
                database: record.config.database.clone(),
                user: record.config.username.clone(),
                is_active: state.active.as_deref() == Some(record.name.as_str()),
                created_at: record.created_at,
            })
            .collect()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockFactory;

    fn sqlite_config(database: &str) -> ConnectionConfig {
        ConnectionConfig::new(Driver::Sqlite, database.to_string())
    }

    fn manager_with(factory: &Arc<MockFactory>) -> ConnectionManager {
        let factory: Arc<dyn ConnectionFactory> = Arc::clone(factory) as Arc<dyn ConnectionFactory>;
        ConnectionManager::new(factory)
    }

    #[tokio::test]
    async fn test_first_connection_stays_active_and_promotion_on_disconnect() {
        let factory = Arc::new(MockFactory::default());
        let manager = manager_with(&factory);
        let credentials = Credentials::anonymous();

        manager.connect("x", sqlite_config("x.db"), &credentials, false).await.unwrap();
        manager.connect("y", sqlite_config("y.db"), &credentials, false).await.unwrap();
        assert_eq!(manager.active_name().await.as_deref(), Some("x"));

        manager.disconnect("x").await.unwrap();
        assert_eq!(manager.active_name().await.as_deref(), Some("y"));

        manager.disconnect("y").await.unwrap();
        assert_eq!(manager.active_name().await, None);
        let error = manager.resolve(None).await.unwrap_err();
        assert!(matches!(error, DbRelayError::NoActiveConnection));
        assert_eq!(
            error.to_string(),
            "No active database connection. Please connect first using connect_database tool."
        );

        assert!(factory.opened().iter().all(|(_, connection)| connection.is_closed()));
    }

    #[tokio::test]
    async fn test_reconnect_reuses_existing_handle() {
        let factory = Arc::new(MockFactory::default());
        let manager = manager_with(&factory);
        let credentials = Credentials::anonymous();

        let first = manager.connect("x", sqlite_config("x.db"), &credentials, false).await.unwrap();
        let second = manager.connect("x", sqlite_config("x.db"), &credentials, false).await.unwrap();

        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(second.total_connections, 1);
        assert_eq!(factory.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_set_active_on_connect_and_switch() {
        let factory = Arc::new(MockFactory::default());
        let manager = manager_with(&factory);
        let credentials = Credentials::anonymous();

        manager.connect("x", sqlite_config("x.db"), &credentials, false).await.unwrap();
        let outcome = manager.connect("y", sqlite_config("y.db"), &credentials, true).await.unwrap();
        assert!(outcome.is_active);
        assert_eq!(manager.resolve(None).await.unwrap().name, "y");

        manager.set_active("x").await.unwrap();
        assert_eq!(manager.resolve(None).await.unwrap().name, "x");

        let error = manager.set_active("z").await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Connection 'z' not found. Available connections: x, y"
        );
    }

    #[tokio::test]
    async fn test_unknown_names_report_available_connections() {
        let factory = Arc::new(MockFactory::default());
        let manager = manager_with(&factory);

        let error = manager.disconnect("ghost").await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Connection 'ghost' not found. Available connections: none"
        );
        assert!(matches!(
            manager.resolve(Some("ghost")).await,
            Err(DbRelayError::ConnectionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_all_closes_everything() {
        let factory = Arc::new(MockFactory::default());
        let manager = manager_with(&factory);
        let credentials = Credentials::anonymous();

        for name in ["a", "b", "c"] {
            manager.connect(name, sqlite_config(name), &credentials, false).await.unwrap();
        }
        assert_eq!(manager.disconnect_all().await, 3);
        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.active_name().await, None);
        assert!(factory.opened().iter().all(|(_, connection)| connection.is_closed()));
    }

    #[tokio::test]
    async fn test_list_connections_omits_password() {
        let factory = Arc::new(MockFactory::default());
        let manager = manager_with(&factory);
        let credentials = Credentials::new("admin".to_string(), Some("hunter2".to_string()));
        let config = ConnectionConfig::new(Driver::Postgres, "app".to_string())
            .with_username("admin".to_string());

        manager.connect("main", config, &credentials, false).await.unwrap();
        let listed = manager.list_connections().await;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user.as_deref(), Some("admin"));
        assert!(listed[0].is_active);
        let json = serde_json::to_string(&listed).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"isActive\":true"));
    }

    #[tokio::test]
    async fn test_resolve_or_connect_uses_db_config_only_without_active() {
        let factory = Arc::new(MockFactory::default());
        let manager = manager_with(&factory);
        let db_config = DbConfig {
            driver: Some(Driver::Sqlite),
            database: Some(":memory:".to_string()),
            ..DbConfig::default()
        };

        let resolved = manager
            .resolve_or_connect(None, Some(&db_config), &DbConfig::default())
            .await
            .unwrap();
        assert_eq!(resolved.name, DEFAULT_CONNECTION_NAME);

        let again = manager
            .resolve_or_connect(None, Some(&db_config), &DbConfig::default())
            .await
            .unwrap();
        assert_eq!(again.name, DEFAULT_CONNECTION_NAME);
        assert_eq!(factory.opened().len(), 1);

        let fresh = manager_with(&factory);
        assert!(matches!(
            fresh.resolve_or_connect(None, None, &DbConfig::default()).await,
            Err(DbRelayError::NoActiveConnection)
        ));
    }

    #[tokio::test]
    async fn test_failed_connect_registers_nothing() {
        let factory = Arc::new(MockFactory::refusing("down.db"));
        let manager = manager_with(&factory);

        let error = manager
            .connect("x", sqlite_config("down.db"), &Credentials::anonymous(), true)
            .await
            .unwrap_err();
        assert!(matches!(error, DbRelayError::Connection { .. }));
        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.active_name().await, None);
    }
}

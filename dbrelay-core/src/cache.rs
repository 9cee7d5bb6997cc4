//! Time-bounded memo of table column metadata.
//!
//! Entries are keyed by connection name and table, stamped with the time they
//! were fetched, and treated as fresh while younger than the TTL. Staleness is
//! checked on access; nothing is evicted in the background.
//!
//! Concurrent misses for the same table may each fetch; the last write wins.
//! The lock is never held across a database round trip.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::adapters::DatabaseConnection;
use crate::models::ColumnInfo;
use crate::validation::{IdentifierKind, validate_identifier};
use crate::{DbRelayError, Result};

/// How long a fetched schema stays fresh
pub const SCHEMA_CACHE_TTL: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    connection: String,
    table: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    columns: Arc<Vec<ColumnInfo>>,
    fetched_at: Instant,
}

/// Schema cache shared by every handler of one connection manager.
#[derive(Debug)]
pub struct SchemaCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(SCHEMA_CACHE_TTL)
    }
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the columns of `table`, fetching them through `connection` when
    /// the cached entry is missing or stale.
    ///
    /// # Errors
    /// Fails with `InvalidIdentifier` before any lookup for a bad table name,
    /// `TableNotFound` when introspection finds no columns (not cached), or
    /// whatever the fetch itself reports.
    pub async fn get_schema(
        &self,
        connection_name: &str,
        connection: &dyn DatabaseConnection,
        table: &str,
    ) -> Result<Arc<Vec<ColumnInfo>>> {
        validate_identifier(table, IdentifierKind::Table)?;
        let key = CacheKey {
            connection: connection_name.to_string(),
            table: table.to_string(),
        };

        let fresh = self
            .entries()
            .get(&key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.columns));
        if let Some(columns) = fresh {
            debug!("Schema cache hit for {}.{}", connection_name, table);
            return Ok(columns);
        }

        debug!("Schema cache miss for {}.{}", connection_name, table);
        let columns = connection.describe_table(table).await?;
        if columns.is_empty() {
            return Err(DbRelayError::TableNotFound {
                table: table.to_string(),
            });
        }

        let columns = Arc::new(columns);
        self.entries().insert(
            key,
            CacheEntry {
                columns: Arc::clone(&columns),
                fetched_at: Instant::now(),
            },
        );
        Ok(columns)
    }

    /// Drops one table's entry on every connection, or the whole cache when
    /// `table` is `None`.
    pub fn invalidate(&self, table: Option<&str>) {
        let mut entries = self.entries();
        match table {
            Some(table) => entries.retain(|key, _| key.table != table),
            None => entries.clear(),
        }
    }

    /// Drops every entry belonging to one connection.
    pub fn invalidate_connection(&self, connection_name: &str) {
        self.entries()
            .retain(|key, _| key.connection != connection_name);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

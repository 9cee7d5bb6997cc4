//! Core of dbrelay: validated, parameterized database actions.
//!
//! This crate turns untrusted structured requests (table and column names,
//! WHERE mappings, data mappings, raw SQL) into parameterized statements,
//! runs them on named connections and reports a uniform result envelope.
//!
//! # Security Guarantees
//! - Table and column names are validated before they are interpolated
//! - Values only ever travel as bound parameters
//! - UPDATE and DELETE without a WHERE condition are refused
//! - Passwords are zeroized on drop and never logged, listed or serialized
//!
//! # Architecture
//! - [`validation`]: identifier grammar
//! - [`query`]: SELECT/INSERT/UPDATE/DELETE builders and raw statements
//! - [`cache`]: schema memo with a fixed TTL
//! - [`manager`]: named connections and the active pointer
//! - [`handlers`]: the public actions composing all of the above
//! - [`adapters`]: driver boundary normalizing results per driver

pub mod adapters;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod manager;
pub mod models;
pub mod query;
pub mod security;
pub mod validation;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, ConnectionFactory, DatabaseConnection, SqlxConnectionFactory};
pub use cache::{SCHEMA_CACHE_TTL, SchemaCache};
pub use config::DbConfig;
pub use error::{DbRelayError, Result};
pub use handlers::{Action, ActionResult, DatabaseActions, QUERY_TIMEOUT};
pub use logging::init_logging;
pub use manager::{ConnectionManager, ConnectionSummary, ResolvedConnection};
pub use models::{ColumnInfo, Driver, ExecutionSummary, IndexInfo, PlaceholderStyle, Row};
pub use security::Credentials;
pub use validation::{IdentifierKind, validate_identifier, validate_identifier_list};

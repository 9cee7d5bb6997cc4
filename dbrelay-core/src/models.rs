//! Driver-neutral shapes shared by adapters, the cache and the handlers.
//!
//! Every adapter normalizes its driver's results into these types so the
//! query builder and handlers never branch on driver-specific shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DbRelayError, Result};

/// A result row: column name to JSON value, in select order.
pub type Row = Map<String, Value>;

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[serde(alias = "mariadb")]
    Mysql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "sqlite3")]
    Sqlite,
}

impl Driver {
    /// Default TCP port for network drivers
    pub const fn default_port(self) -> Option<u16> {
        match self {
            Self::Mysql => Some(3306),
            Self::Postgres => Some(5432),
            Self::Sqlite => None,
        }
    }

    /// Placeholder style the driver's prepared statements expect
    pub const fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Self::Postgres => PlaceholderStyle::Numbered,
            Self::Mysql | Self::Sqlite => PlaceholderStyle::QuestionMark,
        }
    }

    /// Lowercase name used on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mysql => write!(f, "MySQL"),
            Self::Postgres => write!(f, "PostgreSQL"),
            Self::Sqlite => write!(f, "SQLite"),
        }
    }
}

impl std::str::FromStr for Driver {
    type Err = DbRelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(DbRelayError::configuration(format!(
                "Unsupported driver '{}'. Expected one of: mysql, postgres, sqlite",
                other
            ))),
        }
    }
}

/// How bound parameters are written into SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` for every parameter (MySQL, SQLite)
    #[default]
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

/// Column metadata returned by table introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub field: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    /// Key marker: `PRI`, `UNI`, `MUL` or empty
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

/// One indexed column of a table index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub column: String,
    pub unique: bool,
    #[serde(rename = "type")]
    pub index_type: String,
}

/// Outcome of a statement that does not return rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionSummary {
    pub rows_affected: u64,
    /// Auto-increment id reported by the driver, when there is one
    pub last_insert_id: Option<i64>,
}

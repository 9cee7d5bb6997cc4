//! Typed argument objects for each action.
//!
//! Field names follow the wire format (`connectionName`, `orderBy`,
//! `setAsActive`, ...). Unknown fields are ignored.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::DbConfig;

/// Which connection an operation runs against.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub connection_name: Option<String>,
    /// Settings for an implicit connection when none is active
    pub db_config: Option<DbConfig>,
}

/// `select` as either `"a, b"` / `"*"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SelectColumns {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDataArgs {
    pub table: String,
    pub select: Option<SelectColumns>,
    #[serde(rename = "where")]
    pub filter: Option<Map<String, Value>>,
    pub order_by: Option<String>,
    pub limit: Option<Value>,
    pub offset: Option<Value>,
    #[serde(flatten)]
    pub target: Target,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordArgs {
    pub table: String,
    pub data: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub target: Target,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordArgs {
    pub table: String,
    pub data: Option<Map<String, Value>>,
    #[serde(rename = "where")]
    pub filter: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub target: Target,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordArgs {
    pub table: String,
    #[serde(rename = "where")]
    pub filter: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub target: Target,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSqlArgs {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(flatten)]
    pub target: Target,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchemaArgs {
    pub table: String,
    #[serde(flatten)]
    pub target: Target,
}

/// Arguments of `connect_database`; omitted settings fall back to the
/// environment defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectArgs {
    pub connection_name: String,
    #[serde(flatten)]
    pub config: DbConfig,
    /// Defaults to `true`
    pub set_as_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchArgs {
    pub connection_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArgs {
    pub connection_name: Option<String>,
}

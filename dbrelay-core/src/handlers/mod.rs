//! The public actions.
//!
//! Every action resolves a connection, validates its input, builds SQL,
//! runs it under the query timeout and reports a single [`ActionResult`].
//! Errors never escape an action; they become `{ success: false, error }`.
//!
//! Name validation always happens before connection resolution, so a bad
//! table or column name is reported without touching any database.

mod args;
mod envelope;
#[cfg(test)]
mod tests;

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub use args::{
    ConnectArgs, CreateRecordArgs, DeleteRecordArgs, DisconnectArgs, QueryDataArgs, RawSqlArgs,
    SelectColumns, SwitchArgs, TableSchemaArgs, Target, UpdateRecordArgs,
};
pub use envelope::ActionResult;

use crate::config::DbConfig;
use crate::manager::{ConnectionManager, ResolvedConnection};
use crate::models::{Driver, Row};
use crate::query::{
    ColumnTypes, DeleteQuery, InsertQuery, RawQuery, SelectQuery, StatementKind, UpdateQuery,
    WhereClause, coerce_integer,
};
use crate::validation::{IdentifierKind, validate_identifier};
use crate::{DbRelayError, Result};

/// Ceiling for a single database round trip
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// The named actions a client can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    QueryData,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    ExecuteRawSql,
    GetTableSchema,
    ConnectDatabase,
    SwitchConnection,
    ListConnections,
    DisconnectDatabase,
    DisconnectAll,
}

impl Action {
    pub const ALL: [Self; 11] = [
        Self::QueryData,
        Self::CreateRecord,
        Self::UpdateRecord,
        Self::DeleteRecord,
        Self::ExecuteRawSql,
        Self::GetTableSchema,
        Self::ConnectDatabase,
        Self::SwitchConnection,
        Self::ListConnections,
        Self::DisconnectDatabase,
        Self::DisconnectAll,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::QueryData => "query_data",
            Self::CreateRecord => "create_record",
            Self::UpdateRecord => "update_record",
            Self::DeleteRecord => "delete_record",
            Self::ExecuteRawSql => "execute_raw_sql",
            Self::GetTableSchema => "get_table_schema",
            Self::ConnectDatabase => "connect_database",
            Self::SwitchConnection => "switch_connection",
            Self::ListConnections => "list_connections",
            Self::DisconnectDatabase => "disconnect_database",
            Self::DisconnectAll => "disconnect_all",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = DbRelayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| DbRelayError::invalid_arguments(format!("Unknown tool: {}", s)))
    }
}

fn parse_args<T: DeserializeOwned>(action: Action, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|error| {
        DbRelayError::invalid_arguments(format!("Invalid arguments for {}: {}", action, error))
    })
}

/// Text and bit-string columns take text parameters as they are; casting to
/// their unsized type names (`character`, `bit`) would truncate.
fn casts_text(sql_type: &str) -> bool {
    !(sql_type == "text" || sql_type.starts_with("character") || sql_type.starts_with("bit"))
}

fn rows_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

/// Action handlers bound to one connection manager.
#[derive(Debug, Clone)]
pub struct DatabaseActions {
    manager: Arc<ConnectionManager>,
    defaults: DbConfig,
    query_timeout: Duration,
}

impl DatabaseActions {
    /// `defaults` fill in any setting a `dbConfig` or `connect_database` call
    /// leaves out.
    pub fn new(manager: Arc<ConnectionManager>, defaults: DbConfig) -> Self {
        Self {
            manager,
            defaults,
            query_timeout: QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub const fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Runs `action` with raw JSON arguments.
    pub async fn invoke(&self, action: Action, arguments: Value) -> ActionResult {
        let result = match action {
            Action::QueryData => self.with_args(action, arguments, Self::query_data).await,
            Action::CreateRecord => self.with_args(action, arguments, Self::create_record).await,
            Action::UpdateRecord => self.with_args(action, arguments, Self::update_record).await,
            Action::DeleteRecord => self.with_args(action, arguments, Self::delete_record).await,
            Action::ExecuteRawSql => {
                self.with_args(action, arguments, Self::execute_raw_sql)
                    .await
            }
            Action::GetTableSchema => {
                self.with_args(action, arguments, Self::get_table_schema)
                    .await
            }
            Action::ConnectDatabase => {
                self.with_args(action, arguments, Self::connect_database)
                    .await
            }
            Action::SwitchConnection => {
                self.with_args(action, arguments, Self::switch_connection)
                    .await
            }
            Action::ListConnections => self.list_connections().await,
            Action::DisconnectDatabase => {
                self.with_args(action, arguments, Self::disconnect_database)
                    .await
            }
            Action::DisconnectAll => self.disconnect_all().await,
        };
        if let Some(error) = &result.error {
            warn!("{} failed: {}", action, error);
        }
        result
    }

    async fn with_args<'a, T, F, Fut>(
        &'a self,
        action: Action,
        arguments: Value,
        handler: F,
    ) -> ActionResult
    where
        T: DeserializeOwned,
        F: FnOnce(&'a Self, T) -> Fut,
        Fut: Future<Output = ActionResult>,
    {
        match parse_args(action, arguments) {
            Ok(args) => handler(self, args).await,
            Err(error) => ActionResult::failure(&error),
        }
    }

    async fn bounded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.query_timeout, operation)
            .await
            .map_err(|_| DbRelayError::QueryTimeout {
                timeout: self.query_timeout,
            })?
    }

    async fn target(&self, target: &Target) -> Result<ResolvedConnection> {
        self.manager
            .resolve_or_connect(
                target.connection_name.as_deref(),
                target.db_config.as_ref(),
                &self.defaults,
            )
            .await
    }

    /// Declared types of `table`'s columns for casting text-bound values.
    ///
    /// Only PostgreSQL needs them: it will not assign a TEXT parameter to a
    /// uuid, timestamp, jsonb or enum column. When the lookup fails the
    /// statement runs uncast and reports its own error.
    async fn column_types(&self, resolved: &ResolvedConnection, table: &str) -> Result<ColumnTypes> {
        if resolved.connection.driver() != Driver::Postgres {
            return Ok(ColumnTypes::new());
        }
        let lookup = self
            .bounded(self.manager.cache().get_schema(
                &resolved.name,
                resolved.connection.as_ref(),
                table,
            ))
            .await;
        match lookup {
            Ok(columns) => Ok(columns
                .iter()
                .filter(|column| casts_text(&column.data_type))
                .map(|column| (column.field.clone(), column.data_type.clone()))
                .collect()),
            Err(error @ DbRelayError::QueryTimeout { .. }) => Err(error),
            Err(error) => {
                debug!("No column types for '{}': {}", table, error);
                Ok(ColumnTypes::new())
            }
        }
    }

    /// `SELECT` with optional filter, projection, ordering and paging.
    pub async fn query_data(&self, args: QueryDataArgs) -> ActionResult {
        self.try_query_data(args).await.into()
    }

    async fn try_query_data(&self, args: QueryDataArgs) -> Result<ActionResult> {
        let mut query = SelectQuery::new(&args.table)?;
        query = match &args.select {
            Some(SelectColumns::Text(list)) => query.select_list(list)?,
            Some(SelectColumns::List(columns)) => query.columns(columns)?,
            None => query,
        };
        let query_has_filter = args.filter.as_ref().is_some_and(|filter| !filter.is_empty());
        if let Some(filter) = &args.filter {
            query = query.filter(WhereClause::from_map(filter)?);
        }
        if let Some(order_by) = args.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
            query = query.order_by_list(order_by)?;
        }
        let limit = args
            .limit
            .as_ref()
            .map(|value| coerce_integer("limit", value))
            .transpose()?
            .flatten();
        let offset = args
            .offset
            .as_ref()
            .map(|value| coerce_integer("offset", value))
            .transpose()?
            .flatten();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(offset) = offset {
            query = query.offset(offset);
        }

        let resolved = self.target(&args.target).await?;
        if query_has_filter {
            query = query.column_types(self.column_types(&resolved, &args.table).await?);
        }
        let built = query.build(resolved.connection.driver().placeholder_style());
        debug!("query_data on '{}': {} ({} params)", resolved.name, built.sql, built.params.len());
        let rows = self
            .bounded(resolved.connection.fetch_rows(&built.sql, &built.params))
            .await?;

        Ok(ActionResult::ok()
            .with_table(args.table)
            .with_detail("query", Value::String(built.sql))
            .with_count(rows.len())
            .with_data(rows_value(rows)))
    }

    /// `INSERT` of one record; reports the generated id when the driver has one.
    pub async fn create_record(&self, args: CreateRecordArgs) -> ActionResult {
        self.try_create_record(args).await.into()
    }

    async fn try_create_record(&self, args: CreateRecordArgs) -> Result<ActionResult> {
        let data = args
            .data
            .ok_or_else(|| DbRelayError::invalid_arguments("Data object is required"))?;
        let query = InsertQuery::new(&args.table, &data)?;

        let resolved = self.target(&args.target).await?;
        let query = query.column_types(self.column_types(&resolved, &args.table).await?);
        let driver = resolved.connection.driver();
        let (affected_rows, insert_id) = if driver == Driver::Postgres {
            let built = query.returning_all().build(driver.placeholder_style());
            debug!("create_record on '{}': {} ({} params)", resolved.name, built.sql, built.params.len());
            let rows = self
                .bounded(resolved.connection.fetch_rows(&built.sql, &built.params))
                .await?;
            let insert_id = rows
                .first()
                .and_then(|row| row.get("id"))
                .and_then(Value::as_i64);
            (u64::try_from(rows.len()).unwrap_or(u64::MAX), insert_id)
        } else {
            let built = query.build(driver.placeholder_style());
            debug!("create_record on '{}': {} ({} params)", resolved.name, built.sql, built.params.len());
            let summary = self
                .bounded(resolved.connection.execute(&built.sql, &built.params))
                .await?;
            (summary.rows_affected, summary.last_insert_id)
        };

        Ok(ActionResult::ok()
            .with_table(args.table)
            .with_insert_id(insert_id)
            .with_affected_rows(affected_rows)
            .with_data(Value::Object(data)))
    }

    /// `UPDATE` guarded by a mandatory, non-empty WHERE mapping.
    pub async fn update_record(&self, args: UpdateRecordArgs) -> ActionResult {
        self.try_update_record(args).await.into()
    }

    async fn try_update_record(&self, args: UpdateRecordArgs) -> Result<ActionResult> {
        let filter = args
            .filter
            .filter(|filter| !filter.is_empty())
            .ok_or(DbRelayError::UnsafeOperation {
                operation: "UPDATE",
            })?;
        let data = args
            .data
            .ok_or_else(|| DbRelayError::invalid_arguments("Data object is required"))?;
        let query = UpdateQuery::new(&args.table, &data)?.filter(WhereClause::from_map(&filter)?);

        let resolved = self.target(&args.target).await?;
        let query = query.column_types(self.column_types(&resolved, &args.table).await?);
        let built = query.build(resolved.connection.driver().placeholder_style())?;
        debug!("update_record on '{}': {} ({} params)", resolved.name, built.sql, built.params.len());
        let summary = self
            .bounded(resolved.connection.execute(&built.sql, &built.params))
            .await?;

        Ok(ActionResult::ok()
            .with_table(args.table)
            .with_affected_rows(summary.rows_affected)
            .with_data(Value::Object(data))
            .with_detail("where", Value::Object(filter)))
    }

    /// `DELETE` guarded by a mandatory, non-empty WHERE mapping.
    pub async fn delete_record(&self, args: DeleteRecordArgs) -> ActionResult {
        self.try_delete_record(args).await.into()
    }

    async fn try_delete_record(&self, args: DeleteRecordArgs) -> Result<ActionResult> {
        let filter = args
            .filter
            .filter(|filter| !filter.is_empty())
            .ok_or(DbRelayError::UnsafeOperation {
                operation: "DELETE",
            })?;
        let query = DeleteQuery::new(&args.table)?.filter(WhereClause::from_map(&filter)?);

        let resolved = self.target(&args.target).await?;
        let query = query.column_types(self.column_types(&resolved, &args.table).await?);
        let built = query.build(resolved.connection.driver().placeholder_style())?;
        debug!("delete_record on '{}': {} ({} params)", resolved.name, built.sql, built.params.len());
        let summary = self
            .bounded(resolved.connection.execute(&built.sql, &built.params))
            .await?;

        Ok(ActionResult::ok()
            .with_table(args.table)
            .with_affected_rows(summary.rows_affected)
            .with_detail("where", Value::Object(filter)))
    }

    /// Arbitrary SQL with explicit parameters.
    ///
    /// No identifier validation is applied: the caller owns the statement.
    pub async fn execute_raw_sql(&self, args: RawSqlArgs) -> ActionResult {
        self.try_execute_raw_sql(args).await.into()
    }

    async fn try_execute_raw_sql(&self, args: RawSqlArgs) -> Result<ActionResult> {
        let query = RawQuery::new(&args.sql, args.params)?;
        let resolved = self.target(&args.target).await?;
        debug!("execute_raw_sql on '{}' ({} params)", resolved.name, query.params.len());

        let result = match query.kind() {
            StatementKind::Rows => {
                let rows = self
                    .bounded(resolved.connection.fetch_rows(&query.sql, &query.params))
                    .await?;
                ActionResult::ok()
                    .with_count(rows.len())
                    .with_data(rows_value(rows))
            }
            StatementKind::Command => {
                let summary = self
                    .bounded(resolved.connection.execute(&query.sql, &query.params))
                    .await?;
                ActionResult::ok()
                    .with_affected_rows(summary.rows_affected)
                    .with_insert_id(summary.last_insert_id)
            }
        };
        Ok(result.with_detail("sql", Value::String(query.sql)))
    }

    /// Column and index metadata; columns come through the schema cache.
    pub async fn get_table_schema(&self, args: TableSchemaArgs) -> ActionResult {
        self.try_get_table_schema(args).await.into()
    }

    async fn try_get_table_schema(&self, args: TableSchemaArgs) -> Result<ActionResult> {
        validate_identifier(&args.table, IdentifierKind::Table)?;
        let resolved = self.target(&args.target).await?;

        let columns = self
            .bounded(self.manager.cache().get_schema(
                &resolved.name,
                resolved.connection.as_ref(),
                &args.table,
            ))
            .await?;
        let indexes = self
            .bounded(resolved.connection.table_indexes(&args.table))
            .await?;

        let columns = serde_json::to_value(columns.as_slice())
            .map_err(|e| DbRelayError::serialization("table columns", e))?;
        let indexes = serde_json::to_value(&indexes)
            .map_err(|e| DbRelayError::serialization("table indexes", e))?;
        Ok(ActionResult::ok()
            .with_table(args.table)
            .with_detail("columns", columns)
            .with_detail("indexes", indexes))
    }

    /// Opens a named connection; unspecified settings come from the defaults.
    pub async fn connect_database(&self, args: ConnectArgs) -> ActionResult {
        self.try_connect_database(args).await.into()
    }

    async fn try_connect_database(&self, args: ConnectArgs) -> Result<ActionResult> {
        let (config, credentials) = args.config.merged_over(&self.defaults).resolve()?;
        let outcome = self
            .manager
            .connect(
                &args.connection_name,
                config,
                &credentials,
                args.set_as_active.unwrap_or(true),
            )
            .await?;
        info!("Connection '{}' ready ({} total)", outcome.name, outcome.total_connections);

        Ok(ActionResult::ok()
            .with_message(format!(
                "Successfully connected to database '{}' as '{}'",
                outcome.database, outcome.name
            ))
            .with_detail("connectionName", Value::String(outcome.name))
            .with_detail("driver", Value::String(outcome.driver.as_str().to_string()))
            .with_detail("database", Value::String(outcome.database))
            .with_detail("isActive", Value::Bool(outcome.is_active))
            .with_detail("totalConnections", Value::from(outcome.total_connections)))
    }

    /// Makes another registered connection the active one.
    pub async fn switch_connection(&self, args: SwitchArgs) -> ActionResult {
        self.try_switch_connection(args).await.into()
    }

    async fn try_switch_connection(&self, args: SwitchArgs) -> Result<ActionResult> {
        self.manager.set_active(&args.connection_name).await?;
        Ok(ActionResult::ok()
            .with_message(format!("Switched to connection '{}'", args.connection_name))
            .with_detail("activeConnection", Value::String(args.connection_name)))
    }

    pub async fn list_connections(&self) -> ActionResult {
        self.try_list_connections().await.into()
    }

    async fn try_list_connections(&self) -> Result<ActionResult> {
        let connections = self.manager.list_connections().await;
        let active = self.manager.active_name().await;
        let total = connections.len();
        let connections = serde_json::to_value(&connections)
            .map_err(|e| DbRelayError::serialization("connection list", e))?;

        Ok(ActionResult::ok()
            .with_detail("activeConnection", active.map_or(Value::Null, Value::String))
            .with_detail("totalConnections", Value::from(total))
            .with_detail("connections", connections))
    }

    /// Closes the named connection, or the active one when no name is given.
    pub async fn disconnect_database(&self, args: DisconnectArgs) -> ActionResult {
        self.try_disconnect_database(args).await.into()
    }

    async fn try_disconnect_database(&self, args: DisconnectArgs) -> Result<ActionResult> {
        let name = match args.connection_name {
            Some(name) => name,
            None => self
                .manager
                .active_name()
                .await
                .ok_or_else(|| DbRelayError::invalid_arguments("No connection to disconnect"))?,
        };
        self.manager.disconnect(&name).await?;
        let remaining = self.manager.connection_count().await;
        let active = self.manager.active_name().await;

        Ok(ActionResult::ok()
            .with_message(format!("Disconnected from '{}'", name))
            .with_detail("remainingConnections", Value::from(remaining))
            .with_detail("activeConnection", active.map_or(Value::Null, Value::String)))
    }

    pub async fn disconnect_all(&self) -> ActionResult {
        let closed = self.manager.disconnect_all().await;
        ActionResult::ok()
            .with_message("All database connections have been closed")
            .with_detail("closedConnections", Value::from(closed))
    }
}

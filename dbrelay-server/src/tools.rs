//! Tool registry: names, descriptions and JSON input schemas.
//!
//! Schemas are compiled once with `jsonschema` and every `tools/call`
//! argument object is checked against them before it reaches a handler.
//! The handlers re-check everything that matters for safety (identifier
//! grammar, non-empty WHERE), so a permissive schema never weakens them.

use std::collections::HashMap;
use std::sync::OnceLock;

use dbrelay_core::Action;
use jsonschema::Validator;
use serde_json::{Map, Value, json};

use crate::error::{Result, ServerError};
use crate::protocol::ToolDefinition;

fn driver_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["mysql", "postgres", "postgresql", "sqlite"],
        "description": "Database driver"
    })
}

fn db_config_schema() -> Value {
    json!({
        "type": "object",
        "description": "Connection settings used when no connection is active; omitted fields fall back to DB_* environment variables",
        "properties": {
            "driver": driver_schema(),
            "host": { "type": "string" },
            "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
            "database": { "type": "string" },
            "user": { "type": "string" },
            "password": { "type": "string" }
        }
    })
}

fn mapping_schema(description: &str) -> Value {
    json!({ "type": "object", "description": description })
}

/// Object schema with the shared `connectionName` and `dbConfig` properties.
fn targeted(mut properties: Map<String, Value>, required: &[&str]) -> Value {
    properties.insert(
        "connectionName".to_string(),
        json!({
            "type": "string",
            "description": "Connection to use (defaults to the active connection)"
        }),
    );
    properties.insert("dbConfig".to_string(), db_config_schema());
    json!({ "type": "object", "properties": properties, "required": required })
}

fn properties(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn table_property() -> Value {
    json!({ "type": "string", "description": "Table name (letters, digits, underscores; optional schema prefix)" })
}

fn description(action: Action) -> &'static str {
    match action {
        Action::QueryData => {
            "Query rows from a table with optional equality filters, column selection, ordering and pagination."
        }
        Action::CreateRecord => "Insert one record into a table and return the generated id.",
        Action::UpdateRecord => {
            "Update records matching a non-empty WHERE mapping. Updates without conditions are refused."
        }
        Action::DeleteRecord => {
            "Delete records matching a non-empty WHERE mapping. Deletes without conditions are refused."
        }
        Action::ExecuteRawSql => {
            "Execute raw SQL with bound parameters. No identifier validation is applied: the statement is run as given."
        }
        Action::GetTableSchema => "Describe a table's columns and indexes.",
        Action::ConnectDatabase => {
            "Open a named database connection. Several connections may be open at once."
        }
        Action::SwitchConnection => "Make another open connection the active one.",
        Action::ListConnections => "List open connections and show which one is active.",
        Action::DisconnectDatabase => {
            "Close one connection (the active one when no name is given)."
        }
        Action::DisconnectAll => "Close every open connection.",
    }
}

/// JSON Schema for the arguments of `action`.
pub fn input_schema(action: Action) -> Value {
    match action {
        Action::QueryData => targeted(
            properties(json!({
                "table": table_property(),
                "select": {
                    "type": ["string", "array"],
                    "items": { "type": "string" },
                    "description": "Comma-separated columns or '*' (default)"
                },
                "where": mapping_schema("Equality conditions joined with AND; null matches IS NULL"),
                "orderBy": { "type": "string", "description": "e.g. 'created_at DESC, id'" },
                "limit": { "type": ["integer", "string"], "description": "Maximum rows; 0 means no limit" },
                "offset": { "type": ["integer", "string"], "description": "Rows to skip (only with limit)" }
            })),
            &["table"],
        ),
        Action::CreateRecord => targeted(
            properties(json!({
                "table": table_property(),
                "data": mapping_schema("Column values to insert")
            })),
            &["table", "data"],
        ),
        Action::UpdateRecord => targeted(
            properties(json!({
                "table": table_property(),
                "data": mapping_schema("Column values to set"),
                "where": mapping_schema("Conditions selecting the rows to update; an empty or missing mapping is refused")
            })),
            &["table", "data"],
        ),
        Action::DeleteRecord => targeted(
            properties(json!({
                "table": table_property(),
                "where": mapping_schema("Conditions selecting the rows to delete; an empty or missing mapping is refused")
            })),
            &["table"],
        ),
        Action::ExecuteRawSql => targeted(
            properties(json!({
                "sql": { "type": "string", "description": "SQL statement with placeholders" },
                "params": { "type": "array", "description": "Values bound to the placeholders in order" }
            })),
            &["sql"],
        ),
        Action::GetTableSchema => targeted(
            properties(json!({ "table": table_property() })),
            &["table"],
        ),
        Action::ConnectDatabase => json!({
            "type": "object",
            "properties": {
                "connectionName": { "type": "string", "description": "Unique name for this connection" },
                "driver": driver_schema(),
                "host": { "type": "string" },
                "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                "database": { "type": "string", "description": "Database name, or file path / ':memory:' for SQLite" },
                "user": { "type": "string" },
                "password": { "type": "string" },
                "setAsActive": { "type": "boolean", "description": "Make this the active connection (default true)" }
            },
            "required": ["connectionName"]
        }),
        Action::SwitchConnection => json!({
            "type": "object",
            "properties": {
                "connectionName": { "type": "string", "description": "Connection to make active" }
            },
            "required": ["connectionName"]
        }),
        Action::DisconnectDatabase => json!({
            "type": "object",
            "properties": {
                "connectionName": { "type": "string", "description": "Connection to close (defaults to the active one)" }
            }
        }),
        Action::ListConnections | Action::DisconnectAll => {
            json!({ "type": "object", "properties": {} })
        }
    }
}

/// Every tool, in registry order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    Action::ALL
        .into_iter()
        .map(|action| ToolDefinition {
            name: action.name().to_string(),
            description: description(action).to_string(),
            input_schema: input_schema(action),
        })
        .collect()
}

/// Compiled schemas, or the tool whose schema failed and why
type CompiledSchemas = std::result::Result<HashMap<Action, Validator>, (&'static str, String)>;

static VALIDATORS: OnceLock<CompiledSchemas> = OnceLock::new();

fn compile_validators() -> CompiledSchemas {
    Action::ALL
        .into_iter()
        .map(|action| {
            jsonschema::validator_for(&input_schema(action))
                .map(|validator| (action, validator))
                .map_err(|e| (action.name(), e.to_string()))
        })
        .collect()
}

/// Compiles every tool schema. Called once at startup; later calls reuse
/// the first outcome.
///
/// # Errors
/// Returns `ServerError::SchemaCompilation` if a declared schema is invalid.
pub fn initialize_validators() -> Result<()> {
    match VALIDATORS.get_or_init(compile_validators) {
        Ok(_) => Ok(()),
        Err((tool, message)) => Err(ServerError::SchemaCompilation {
            tool: *tool,
            message: message.clone(),
        }),
    }
}

/// Checks `arguments` against the schema of `action`.
///
/// # Errors
/// Returns a readable message listing every violation.
pub fn validate_arguments(action: Action, arguments: &Value) -> std::result::Result<(), String> {
    initialize_validators().map_err(|e| e.to_string())?;
    let Some(validator) = VALIDATORS
        .get()
        .and_then(|compiled| compiled.as_ref().ok())
        .and_then(|validators| validators.get(&action))
    else {
        return Ok(());
    };

    let errors: Vec<String> = validator
        .iter_errors(arguments)
        .map(|error| error.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Invalid arguments for {}: {}",
            action,
            errors.join("; ")
        ))
    }
}

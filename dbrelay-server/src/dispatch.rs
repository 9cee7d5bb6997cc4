//! Maps JSON-RPC requests onto database actions.

use dbrelay_core::{Action, ActionResult, DatabaseActions, DbRelayError};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::protocol::{
    CallToolParams, CallToolResult, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
    RpcError, ToolContent, methods,
};
use crate::tools::{tool_definitions, validate_arguments};

/// Server name announced by `initialize`
pub const SERVER_NAME: &str = "dbrelay";

/// Answers protocol requests using one set of database actions.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    actions: DatabaseActions,
}

impl ToolDispatcher {
    pub const fn new(actions: DatabaseActions) -> Self {
        Self { actions }
    }

    pub const fn actions(&self) -> &DatabaseActions {
        &self.actions
    }

    /// Handles one request. Notifications produce no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Received {} ({:?})", request.method, request.id);
        let Some(id) = request.id else {
            if request.method != methods::INITIALIZED {
                debug!("Ignoring notification {}", request.method);
            }
            return None;
        };

        let outcome = match request.method.as_str() {
            methods::INITIALIZE => Ok(Self::initialize_result()),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => Ok(json!({ "tools": tool_definitions() })),
            methods::TOOLS_CALL => self.call_tool(request.params).await,
            other => Err(RpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(Some(id), result),
            Err(error) => JsonRpcResponse::error(Some(id), error),
        })
    }

    fn initialize_result() -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| RpcError::invalid_params("missing tools/call params"))
            .and_then(|params| serde_json::from_value(params).map_err(RpcError::invalid_params))?;
        let arguments = match params.arguments {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(arguments) => arguments,
        };

        let result = self.run_tool(&params.name, arguments).await;
        let is_error = !result.success;
        let text = serde_json::to_string_pretty(&result).map_err(|e| {
            RpcError::new(-32603, format!("Failed to encode tool result: {}", e))
        })?;

        serde_json::to_value(CallToolResult {
            content: vec![ToolContent::Text { text }],
            is_error,
        })
        .map_err(|e| RpcError::new(-32603, format!("Failed to encode tool result: {}", e)))
    }

    async fn run_tool(&self, name: &str, arguments: Value) -> ActionResult {
        let action = match name.parse::<Action>() {
            Ok(action) => action,
            Err(error) => {
                warn!("Unknown tool requested: {}", name);
                return ActionResult::failure(&error);
            }
        };
        if let Err(message) = validate_arguments(action, &arguments) {
            return ActionResult::failure(&DbRelayError::invalid_arguments(message));
        }
        self.actions.invoke(action, arguments).await
    }
}

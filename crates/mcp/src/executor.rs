use llm::{ToolContext, ToolExecutor, UnifiedToolUse};
use serde_json::Value;

use crate::{
    error::McpError,
    types::{JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, McpToolCallParams, McpToolResult, RequestId, TOOLS_CALL},
};

/// Serves `tools/call` requests from a [`ToolExecutor`].
#[derive(Clone)]
pub struct McpToolExecutor {
    executor: ToolExecutor,
}

impl McpToolExecutor {
    pub fn new(executor: ToolExecutor) -> Self {
        Self { executor }
    }

    /// Parses and handles a raw request body.
    pub async fn handle_raw(&self, body: &str, ctx: &ToolContext) -> JsonRpcResponse {
        match serde_json::from_str::<JsonRpcRequest>(body) {
            Ok(request) => self.handle(request, ctx).await,
            Err(e) => {
                log::debug!("Rejecting unparsable JSON-RPC request: {e}");
                JsonRpcResponse::failure(None, McpError::parse_error(format!("Parse error: {e}")).into())
            }
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest, ctx: &ToolContext) -> JsonRpcResponse {
        let id = request.id.clone();

        match self.call(request, ctx).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::failure(id, McpError::internal(e.to_string()).into()),
            },
            Err(error) => {
                log::debug!("JSON-RPC request failed: {error}");
                JsonRpcResponse::failure(id, error.into())
            }
        }
    }

    async fn call(&self, request: JsonRpcRequest, ctx: &ToolContext) -> Result<McpToolResult, McpError> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(McpError::invalid_request(r#"Invalid Request: jsonrpc must be "2.0""#));
        }

        if request.method != TOOLS_CALL {
            return Err(McpError::method_not_found(&request.method));
        }

        let params = match request.params {
            Some(Value::Object(params)) if params.contains_key("name") => {
                serde_json::from_value::<McpToolCallParams>(Value::Object(params))
                    .map_err(|e| McpError::invalid_params(format!("Invalid tools/call params: {e}")))?
            }
            _ => return Err(McpError::invalid_params("Missing tool name in params")),
        };

        if !self.executor.has_tool(&params.name) {
            return Err(McpError::tool_not_found(&params.name));
        }

        let tool_use = UnifiedToolUse {
            id: request.id.as_ref().map(RequestId::to_string).unwrap_or_default(),
            name: params.name,
            input: Some(params.arguments),
        };

        log::debug!("Executing tool '{}' for JSON-RPC request", tool_use.name);

        let result = self.executor.execute(&tool_use, ctx).await;

        Ok(McpToolResult::text(result.content, result.is_error))
    }
}

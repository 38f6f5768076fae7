//! Mapping between unified messages and `tools/call` envelopes.

use llm::{UnifiedContent, UnifiedProvider, UnifiedRequest, UnifiedResponse, UnifiedStopReason, UnifiedToolResult};

use crate::{
    error::McpError,
    types::{JsonRpcRequest, JsonRpcResponse, McpToolCallParams, McpToolResult, RequestId, TOOLS_CALL},
};

/// A `tools/call` request for the first tool use of the last message.
pub fn unified_to_mcp_request(request: &UnifiedRequest, id: impl Into<RequestId>) -> Result<JsonRpcRequest, McpError> {
    let tool_use = request
        .messages
        .last()
        .and_then(|message| message.tool_uses().next())
        .ok_or_else(|| McpError::invalid_request("No tool call found in the last message"))?;

    let params = McpToolCallParams {
        name: tool_use.name.clone(),
        arguments: tool_use.input.clone().unwrap_or_default(),
    };

    let params = serde_json::to_value(params).map_err(|e| McpError::internal(e.to_string()))?;

    Ok(JsonRpcRequest::new(id, TOOLS_CALL, Some(params)))
}

/// A response holding the outcome of the call as one `tool_result` block.
///
/// JSON-RPC errors and malformed results become error tool results.
pub fn mcp_response_to_unified(response: &JsonRpcResponse, tool_use_id: &str) -> UnifiedResponse {
    let (content, is_error) = match (&response.error, &response.result) {
        (Some(error), _) => (error.message.clone(), true),
        (None, Some(result)) => match serde_json::from_value::<McpToolResult>(result.clone()) {
            Ok(result) => {
                let is_error = result.is_error.unwrap_or(false);
                let fallback = if is_error { "Unknown error" } else { "" };

                (result.first_text().unwrap_or(fallback).to_string(), is_error)
            }
            Err(e) => {
                log::warn!("Malformed tools/call result for '{tool_use_id}': {e}");
                (format!("Malformed tools/call result: {e}"), true)
            }
        },
        (None, None) => ("Unknown error".to_string(), true),
    };

    UnifiedResponse {
        id: response.id.as_ref().map(RequestId::to_string),
        content: vec![UnifiedContent::ToolResult(UnifiedToolResult {
            tool_use_id: tool_use_id.to_string(),
            tool_name: None,
            content,
            is_error: Some(is_error),
        })],
        stop_reason: UnifiedStopReason::EndTurn,
        provider: Some(UnifiedProvider::Mcp),
        ..UnifiedResponse::empty()
    }
}

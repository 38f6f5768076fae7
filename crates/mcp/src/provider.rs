use std::time::Duration;

use async_trait::async_trait;
use config::McpProviderConfig;
use llm::{EventStream, LlmError, LlmResult, Provider, UnifiedProvider, UnifiedRequest, UnifiedResponse};
use tokio_util::sync::CancellationToken;

use crate::{
    convert::{mcp_response_to_unified, unified_to_mcp_request},
    types::{JsonRpcResponse, RequestId},
};

/// Adapter sending the pending tool call of a conversation to a JSON-RPC endpoint.
pub struct McpProvider {
    client: reqwest::Client,
    url: String,
    name: String,
}

impl McpProvider {
    pub fn new(name: String, config: McpProviderConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                log::error!("Failed to create HTTP client for MCP provider: {e}");
                LlmError::InternalError(None)
            })?;

        Ok(Self {
            client,
            url: config.url,
            name,
        })
    }
}

#[async_trait]
impl Provider for McpProvider {
    fn provider(&self) -> UnifiedProvider {
        UnifiedProvider::Mcp
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &UnifiedRequest) -> LlmResult<UnifiedResponse> {
        let tool_use_id = request
            .messages
            .last()
            .and_then(|message| message.tool_uses().next())
            .map(|tool_use| tool_use.id.clone())
            .ok_or_else(|| LlmError::InvalidRequest("No tool call found in the last message".to_string()))?;

        let rpc_request = unified_to_mcp_request(request, RequestId::from(tool_use_id.as_str()))
            .map_err(|e| LlmError::InvalidRequest(e.message))?;

        log::debug!("Sending tools/call for '{tool_use_id}' to {}", self.name);

        let response = llm::provider::send_json("MCP", self.client.post(&self.url), &rpc_request).await?;
        let response: JsonRpcResponse = llm::provider::read_json("MCP", response).await?;

        Ok(mcp_response_to_unified(&response, &tool_use_id))
    }

    async fn stream(&self, _: &UnifiedRequest, _: CancellationToken) -> LlmResult<EventStream> {
        Err(LlmError::StreamingNotSupported)
    }
}

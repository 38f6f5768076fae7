use std::sync::Arc;

use config::McpProviderConfig;
use integration_tests::{TestServer, spawn_mcp, tools};
use llm::{
    LlmError, LlmService, UnifiedContent, UnifiedMessage, UnifiedProvider, UnifiedRequest, UnifiedRole,
    UnifiedToolResult, UnifiedToolUse,
};
use mcp::{McpProvider, McpToolExecutor};
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn setup() -> (TestServer, LlmService) {
    let server = spawn_mcp(McpToolExecutor::new(tools::executor())).await;

    let provider = McpProvider::new(
        "tools".to_string(),
        McpProviderConfig {
            url: server.url("/mcp"),
        },
    )
    .unwrap();

    let mut service = LlmService::new();
    service.register(Arc::new(provider));

    (server, service)
}

fn pending_call(name: &str, input: serde_json::Value) -> UnifiedRequest {
    UnifiedRequest::builder()
        .model("tools")
        .provider(UnifiedProvider::Mcp)
        .user("Please compute")
        .message(UnifiedMessage::blocks(
            UnifiedRole::Assistant,
            vec![UnifiedContent::ToolUse(UnifiedToolUse {
                id: "toolu_42".to_string(),
                name: name.to_string(),
                input: input.as_object().cloned(),
            })],
        ))
        .build()
        .unwrap()
}

fn tool_result(content: &[UnifiedContent]) -> &UnifiedToolResult {
    match content {
        [UnifiedContent::ToolResult(result)] => result,
        other => panic!("expected a single tool result, got {other:?}"),
    }
}

#[tokio::test]
async fn pending_tool_call_is_answered() {
    let (_server, service) = setup().await;

    let response = service.chat(&pending_call("adder", json!({"a": 1, "b": 2}))).await.unwrap();

    assert_eq!(response.provider, Some(UnifiedProvider::Mcp));
    assert_eq!(response.id.as_deref(), Some("toolu_42"));

    let result = tool_result(&response.content);
    assert_eq!(result.tool_use_id, "toolu_42");
    assert_eq!(result.content, "3");
    assert_eq!(result.is_error, Some(false));
}

#[tokio::test]
async fn failures_come_back_as_error_results() {
    let (_server, service) = setup().await;

    let response = service.chat(&pending_call("failing_tool", json!({}))).await.unwrap();

    let result = tool_result(&response.content);
    assert_eq!(result.content, "This tool always fails");
    assert_eq!(result.is_error, Some(true));

    let response = service.chat(&pending_call("sub", json!({"a": 1}))).await.unwrap();

    let result = tool_result(&response.content);
    assert_eq!(result.content, "Tool sub not found");
    assert_eq!(result.is_error, Some(true));
}

#[tokio::test]
async fn conversations_without_a_pending_call_are_rejected() {
    let (_server, service) = setup().await;

    let request = UnifiedRequest::builder()
        .model("tools")
        .provider(UnifiedProvider::Mcp)
        .user("Nothing to call")
        .build()
        .unwrap();

    let error = service.chat(&request).await.unwrap_err();
    assert!(matches!(error, LlmError::InvalidRequest(_)), "{error:?}");

    let error = service.stream(&request, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(error, LlmError::StreamingNotSupported), "{error:?}");
}

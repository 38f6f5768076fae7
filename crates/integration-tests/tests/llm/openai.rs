use futures::StreamExt;
use integration_tests::{MockReply, MockVendor, provider_config, tools};
use llm::{LlmService, StreamEvent, ToolContext, UnifiedRequest, UnifiedStopReason};
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn service(vendor: &MockVendor) -> LlmService {
    let config = provider_config("openai", &vendor.url("/v1"));
    LlmService::from_config(&config.llm).unwrap().max_iterations(config.tools.max_iterations)
}

fn request(text: &str) -> UnifiedRequest {
    UnifiedRequest::builder()
        .model("gpt-4o")
        .system("You are terse.")
        .user(text)
        .build()
        .unwrap()
}

fn completion(message: serde_json::Value, finish_reason: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o",
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25}
    })
}

fn chunk(delta: serde_json::Value, finish_reason: Option<&str>) -> serde_json::Value {
    json!({
        "id": "chatcmpl-2",
        "object": "chat.completion.chunk",
        "created": 1700000000,
        "model": "gpt-4o",
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    })
}

#[tokio::test]
async fn chat() {
    let vendor = MockVendor::start([MockReply::Json(completion(
        json!({"role": "assistant", "content": "Paris."}),
        "stop",
    ))])
    .await;

    let response = service(&vendor)
        .await
        .chat(&request("Capital of France?"))
        .await
        .unwrap();

    assert_eq!(response.text(), "Paris.");
    assert_eq!(response.stop_reason, UnifiedStopReason::EndTurn);

    let sent = &vendor.requests()[0];
    assert_eq!(sent.uri, "/v1/chat/completions");
    assert_eq!(sent.header("authorization"), Some("Bearer test-key"));

    let messages = sent.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], json!("system"));
    assert_eq!(messages[1]["content"], json!("Capital of France?"));
}

#[tokio::test]
async fn streaming_with_tool_calls() {
    let events = [
        chunk(json!({"role": "assistant", "content": ""}), None),
        chunk(
            json!({"tool_calls": [{"index": 0, "id": "call_1", "type": "function", "function": {"name": "adder", "arguments": ""}}]}),
            None,
        ),
        chunk(json!({"tool_calls": [{"index": 0, "function": {"arguments": "{\"a\": 4,"}}]}), None),
        chunk(json!({"tool_calls": [{"index": 0, "function": {"arguments": " \"b\": 5}"}}]}), None),
        chunk(json!({}), Some("tool_calls")),
        json!({
            "id": "chatcmpl-2",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4o",
            "choices": [],
            "usage": {"prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42}
        }),
    ];

    let mut body = events.iter().map(|event| format!("data: {event}\n\n")).collect::<String>();
    body.push_str("data: [DONE]\n\n");

    let vendor = MockVendor::start([MockReply::Sse(body)]).await;

    let response = service(&vendor)
        .await
        .stream(&request("4 + 5?"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.stop_reason, UnifiedStopReason::ToolUse);

    let tool_use = response.tool_uses().next().unwrap();
    assert_eq!(tool_use.id, "call_1");
    assert_eq!(tool_use.input, json!({"a": 4, "b": 5}).as_object().cloned());
    assert_eq!(response.usage.as_ref().and_then(|usage| usage.total_tokens), Some(42));

    let sent = &vendor.requests()[0];
    assert_eq!(sent.body["stream"], json!(true));
    assert_eq!(sent.body["stream_options"], json!({"include_usage": true}));
}

#[tokio::test]
async fn raw_events() {
    let vendor = MockVendor::start([MockReply::sse(&[
        chunk(json!({"role": "assistant", "content": "Hi"}), None),
        chunk(json!({}), Some("stop")),
    ])])
    .await;

    let events = service(&vendor)
        .await
        .stream_events(&request("Hello"), CancellationToken::new())
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await;

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| matches!(event, Ok(StreamEvent::OpenAi(_)))));
}

#[tokio::test]
async fn tool_loop() {
    let vendor = MockVendor::start([
        MockReply::Json(completion(
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "call_a", "type": "function", "function": {"name": "adder", "arguments": "{\"a\": 1, \"b\": 2}"}},
                    {"id": "call_b", "type": "function", "function": {"name": "failing_tool", "arguments": "{}"}}
                ]
            }),
            "tool_calls",
        )),
        MockReply::Json(completion(json!({"role": "assistant", "content": "1 + 2 = 3"}), "stop")),
    ])
    .await;

    let executor = tools::executor();

    let response = service(&vendor)
        .await
        .chat_with_tools(request("1 + 2?"), &executor, &ToolContext::new())
        .await
        .unwrap();

    assert_eq!(response.text(), "1 + 2 = 3");

    let requests = vendor.requests();
    let messages = requests[1].body["messages"].as_array().unwrap();

    let tool_messages = messages
        .iter()
        .filter(|message| message["role"] == json!("tool"))
        .map(|message| (message["tool_call_id"].clone(), message["content"].clone()))
        .collect::<Vec<_>>();

    assert_eq!(
        tool_messages,
        [
            (json!("call_a"), json!("3")),
            (json!("call_b"), json!("This tool always fails")),
        ]
    );
}

use integration_tests::{MockReply, MockVendor, provider_config, tools};
use llm::{
    LlmError, LlmService, ToolContext, UnifiedContent, UnifiedMessage, UnifiedRequest, UnifiedRole, UnifiedStopReason,
    messages::unified::UnifiedImageSource,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn service(vendor: &MockVendor) -> LlmService {
    let config = provider_config("anthropic", &vendor.url("/v1"));
    LlmService::from_config(&config.llm).unwrap().max_iterations(config.tools.max_iterations)
}

fn request(text: &str) -> UnifiedRequest {
    UnifiedRequest::builder()
        .model("claude-3-5-sonnet-20241022")
        .user(text)
        .build()
        .unwrap()
}

fn message(content: serde_json::Value, stop_reason: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": content,
        "stop_reason": stop_reason,
        "stop_sequence": null,
        "usage": {"input_tokens": 12, "output_tokens": 7}
    })
}

#[tokio::test]
async fn chat() {
    let vendor = MockVendor::start([MockReply::Json(message(
        json!([{"type": "text", "text": "Hello there!"}]),
        "end_turn",
    ))])
    .await;

    let response = service(&vendor).await.chat(&request("Hi")).await.unwrap();

    assert_eq!(response.text(), "Hello there!");
    assert_eq!(response.stop_reason, UnifiedStopReason::EndTurn);
    assert_eq!(response.usage.as_ref().map(|usage| usage.input_tokens), Some(12));

    let requests = vendor.requests();
    assert_eq!(requests.len(), 1);

    let sent = &requests[0];
    assert_eq!(sent.uri, "/v1/messages");
    assert_eq!(sent.header("x-api-key"), Some("test-key"));
    assert_eq!(sent.header("anthropic-version"), Some("2023-06-01"));

    insta::assert_json_snapshot!(sent.body, @r#"
    {
      "max_tokens": 4096,
      "messages": [
        {
          "content": "Hi",
          "role": "user"
        }
      ],
      "model": "claude-3-5-sonnet-20241022"
    }
    "#);
}

#[tokio::test]
async fn original_body_is_kept_as_received() {
    let mut body = message(
        json!([
            {"type": "redacted_thinking", "data": "ENCRYPTED"},
            {"type": "text", "text": "Hello there!"}
        ]),
        "end_turn",
    );
    body["service_tier"] = json!("standard");

    let vendor = MockVendor::start([MockReply::Json(body.clone())]).await;

    let response = service(&vendor).await.chat(&request("Hi")).await.unwrap();

    assert_eq!(response.text(), "Hello there!");
    assert_eq!(response.original.as_ref(), Some(&body));
    assert_eq!(response.to_original().unwrap(), body);
}

#[tokio::test]
async fn streaming() {
    let events = [
        json!({
            "type": "message_start",
            "message": {
                "id": "msg_02", "type": "message", "role": "assistant", "model": "claude-3-5-sonnet-20241022",
                "content": [], "stop_reason": null, "stop_sequence": null,
                "usage": {"input_tokens": 9, "output_tokens": 1}
            }
        }),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        json!({"type": "ping"}),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hello"}}),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": " world"}}),
        json!({"type": "content_block_stop", "index": 0}),
        json!({"type": "message_delta", "delta": {"stop_reason": "end_turn", "stop_sequence": null}, "usage": {"output_tokens": 4}}),
        json!({"type": "message_stop"}),
    ];

    let vendor = MockVendor::start([MockReply::named_sse(&events)]).await;

    let response = service(&vendor)
        .await
        .stream(&request("Hi"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.text(), "Hello world");
    assert_eq!(response.stop_reason, UnifiedStopReason::EndTurn);
    assert_eq!(response.id.as_deref(), Some("msg_02"));

    let sent = &vendor.requests()[0];
    assert_eq!(sent.body["stream"], json!(true));
}

#[tokio::test]
async fn tool_loop() {
    let vendor = MockVendor::start([
        MockReply::Json(message(
            json!([
                {"type": "text", "text": "Let me calculate that."},
                {"type": "tool_use", "id": "toolu_01", "name": "calculator", "input": {"operation": "add", "x": 2, "y": 3}}
            ]),
            "tool_use",
        )),
        MockReply::Json(message(json!([{"type": "text", "text": "2 + 3 = 5"}]), "end_turn")),
    ])
    .await;

    let executor = tools::executor();

    let response = service(&vendor)
        .await
        .chat_with_tools(request("What is 2 + 3?"), &executor, &ToolContext::new())
        .await
        .unwrap();

    assert_eq!(response.text(), "2 + 3 = 5");

    let requests = vendor.requests();
    assert_eq!(requests.len(), 2);

    let catalog = requests[0].body["tools"].as_array().unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog[0]["name"], json!("calculator"));

    insta::assert_json_snapshot!(requests[1].body["messages"], @r#"
    [
      {
        "content": "What is 2 + 3?",
        "role": "user"
      },
      {
        "content": [
          {
            "text": "Let me calculate that.",
            "type": "text"
          },
          {
            "id": "toolu_01",
            "input": {
              "operation": "add",
              "x": 2,
              "y": 3
            },
            "name": "calculator",
            "type": "tool_use"
          }
        ],
        "role": "assistant"
      },
      {
        "content": [
          {
            "content": "5.0",
            "is_error": false,
            "tool_use_id": "toolu_01",
            "type": "tool_result"
          }
        ],
        "role": "user"
      }
    ]
    "#);
}

#[tokio::test]
async fn upstream_errors_are_mapped() {
    let vendor = MockVendor::start([
        MockReply::Status(429, json!({"type": "error", "error": {"type": "rate_limit_error", "message": "slow down"}})),
        MockReply::Status(401, json!({"type": "error", "error": {"type": "authentication_error", "message": "bad key"}})),
        MockReply::Status(529, json!({"type": "error", "error": {"type": "overloaded_error", "message": "busy"}})),
    ])
    .await;

    let service = service(&vendor).await;

    let error = service.chat(&request("Hi")).await.unwrap_err();
    assert!(matches!(error, LlmError::RateLimitExceeded { .. }), "{error:?}");

    let error = service.chat(&request("Hi")).await.unwrap_err();
    assert!(matches!(error, LlmError::AuthenticationFailed(_)), "{error:?}");

    let error = service.chat(&request("Hi")).await.unwrap_err();
    assert!(matches!(error, LlmError::ProviderApiError { status: 529, .. }), "{error:?}");

    assert_eq!(vendor.requests().len(), 3);
}

#[tokio::test]
async fn images_fail_before_sending() {
    let vendor = MockVendor::start([]).await;

    let request = UnifiedRequest::builder()
        .model("claude-3-5-sonnet-20241022")
        .message(UnifiedMessage::blocks(
            UnifiedRole::User,
            vec![UnifiedContent::Image {
                source: UnifiedImageSource {
                    source_type: "base64".to_string(),
                    media_type: "image/png".to_string(),
                    data: "iVBORw0KGgo=".to_string(),
                },
            }],
        ))
        .build()
        .unwrap();

    let error = service(&vendor).await.chat(&request).await.unwrap_err();

    assert_eq!(error.to_string(), "Unsupported content type: image");
    assert!(vendor.requests().is_empty());
}

use integration_tests::{MockReply, MockVendor, provider_config, tools};
use llm::{LlmService, ToolContext, UnifiedProvider, UnifiedRequest, UnifiedStopReason};
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn service(vendor: &MockVendor) -> LlmService {
    let config = provider_config("google", &vendor.url("/v1beta"));
    LlmService::from_config(&config.llm).unwrap().max_iterations(config.tools.max_iterations)
}

fn request(text: &str) -> UnifiedRequest {
    UnifiedRequest::builder()
        .model("gemini-1.5-pro")
        .user(text)
        .provider(UnifiedProvider::Google)
        .build()
        .unwrap()
}

fn candidate(parts: serde_json::Value, finish_reason: Option<&str>) -> serde_json::Value {
    let mut candidate = json!({"content": {"role": "model", "parts": parts}, "index": 0});

    if let Some(reason) = finish_reason {
        candidate["finishReason"] = json!(reason);
    }

    json!({"candidates": [candidate], "modelVersion": "gemini-1.5-pro"})
}

#[tokio::test]
async fn chat() {
    let mut reply = candidate(json!([{"text": "Bonjour"}]), Some("STOP"));
    reply["usageMetadata"] = json!({"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6});

    let vendor = MockVendor::start([MockReply::Json(reply)]).await;

    let response = service(&vendor).await.chat(&request("Say hello in French")).await.unwrap();

    assert_eq!(response.text(), "Bonjour");
    assert_eq!(response.stop_reason, UnifiedStopReason::EndTurn);
    assert_eq!(response.usage.as_ref().and_then(|usage| usage.total_tokens), Some(6));

    let sent = &vendor.requests()[0];
    assert_eq!(sent.uri, "/v1beta/models/gemini-1.5-pro:generateContent");
    assert_eq!(sent.header("x-goog-api-key"), Some("test-key"));
    assert_eq!(sent.body["contents"][0]["parts"][0]["text"], json!("Say hello in French"));
}

#[tokio::test]
async fn streamed_function_calls_get_positional_ids() {
    let vendor = MockVendor::start([MockReply::sse(&[
        candidate(json!([{"text": "Checking both."}]), None),
        candidate(json!([{"functionCall": {"name": "adder", "args": {"a": 1, "b": 1}}}]), None),
        candidate(
            json!([{"functionCall": {"name": "calculator", "args": {"operation": "multiply", "x": 3, "y": 4}}}]),
            Some("STOP"),
        ),
    ])])
    .await;

    let response = service(&vendor)
        .await
        .stream(&request("Two sums"), CancellationToken::new())
        .await
        .unwrap();

    let ids = response.tool_uses().map(|tool_use| tool_use.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, ["google_fc_0", "google_fc_1"]);
    assert_eq!(response.stop_reason, UnifiedStopReason::ToolUse);
    assert_eq!(response.text(), "Checking both.");

    let sent = &vendor.requests()[0];
    assert_eq!(sent.uri, "/v1beta/models/gemini-1.5-pro:streamGenerateContent?alt=sse");
}

#[tokio::test]
async fn tool_loop() {
    let vendor = MockVendor::start([
        MockReply::Json(candidate(
            json!([{"functionCall": {"name": "calculator", "args": {"operation": "divide", "x": 1, "y": 0}}}]),
            Some("STOP"),
        )),
        MockReply::Json(candidate(json!([{"text": "Cannot divide by zero."}]), Some("STOP"))),
    ])
    .await;

    let executor = tools::executor();

    let response = service(&vendor)
        .await
        .chat_with_tools(request("1 / 0?"), &executor, &ToolContext::new())
        .await
        .unwrap();

    assert_eq!(response.text(), "Cannot divide by zero.");

    let requests = vendor.requests();
    assert_eq!(requests.len(), 2);

    insta::assert_json_snapshot!(requests[1].body["contents"], @r#"
    [
      {
        "parts": [
          {
            "text": "1 / 0?"
          }
        ],
        "role": "user"
      },
      {
        "parts": [
          {
            "functionCall": {
              "args": {
                "operation": "divide",
                "x": 1,
                "y": 0
              },
              "name": "calculator"
            },
            "thoughtSignature": ""
          }
        ],
        "role": "model"
      },
      {
        "parts": [
          {
            "functionResponse": {
              "name": "calculator",
              "response": {
                "content": "Division by zero"
              }
            }
          }
        ],
        "role": "user"
      }
    ]
    "#);
}

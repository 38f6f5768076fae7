use config::Config;
use indoc::formatdoc;
use integration_tests::{MockReply, MockVendor, tools};
use llm::{LlmError, LlmService, ToolContext, UnifiedProvider, UnifiedRequest};
use serde_json::json;

fn anthropic_text(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-haiku-20241022",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": 3, "output_tokens": 2}
    })
}

fn openai_text(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o-mini",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
    })
}

fn request(provider: Option<UnifiedProvider>) -> UnifiedRequest {
    let builder = UnifiedRequest::builder().model("any-model").user("Who are you?");

    match provider {
        Some(provider) => builder.provider(provider).build().unwrap(),
        None => builder.build().unwrap(),
    }
}

#[tokio::test]
async fn requests_are_routed_by_hint_then_default() {
    let anthropic = MockVendor::start([MockReply::Json(anthropic_text("Claude"))]).await;
    let openai = MockVendor::start([
        MockReply::Json(openai_text("GPT")),
        MockReply::Json(openai_text("GPT again")),
    ])
    .await;

    let config = Config::from_toml(&formatdoc! {r#"
        [llm]
        default_provider = "gpt"

        [llm.providers.claude]
        type = "anthropic"
        api_key = "ant-key"
        base_url = "{anthropic}"

        [llm.providers.gpt]
        type = "openai"
        api_key = "oai-key"
        base_url = "{openai}"
    "#, anthropic = anthropic.url("/v1"), openai = openai.url("/v1")})
    .unwrap();

    let service = LlmService::from_config(&config.llm).unwrap();

    assert_eq!(
        service.available_providers(),
        [UnifiedProvider::Anthropic, UnifiedProvider::OpenAi]
    );

    let response = service.chat(&request(None)).await.unwrap();
    assert_eq!(response.text(), "GPT");
    assert_eq!(response.provider, Some(UnifiedProvider::OpenAi));

    let response = service.chat(&request(Some(UnifiedProvider::Anthropic))).await.unwrap();
    assert_eq!(response.text(), "Claude");
    assert_eq!(response.provider, Some(UnifiedProvider::Anthropic));

    let response = service.chat(&request(Some(UnifiedProvider::OpenAi))).await.unwrap();
    assert_eq!(response.text(), "GPT again");

    assert_eq!(anthropic.requests().len(), 1);
    assert_eq!(openai.requests().len(), 2);
    assert_eq!(anthropic.requests()[0].header("x-api-key"), Some("ant-key"));
}

#[tokio::test]
async fn missing_adapters_fail_without_network_calls() {
    let vendor = MockVendor::start([]).await;

    let config = Config::from_toml(&formatdoc! {r#"
        [llm.providers.gemini]
        type = "google"
        base_url = "{base_url}"
    "#, base_url = vendor.url("/v1beta")})
    .unwrap();

    let service = LlmService::from_config(&config.llm).unwrap();

    let error = service.chat(&request(Some(UnifiedProvider::Google))).await.unwrap_err();
    assert!(matches!(error, LlmError::ProviderNotAvailable(UnifiedProvider::Google)), "{error:?}");

    let error = service.chat(&request(Some(UnifiedProvider::Anthropic))).await.unwrap_err();
    assert!(matches!(error, LlmError::NoAdapter(UnifiedProvider::Anthropic)), "{error:?}");

    let error = service.chat(&request(None)).await.unwrap_err();
    assert!(matches!(error, LlmError::UnknownProvider(_)), "{error:?}");

    assert!(vendor.requests().is_empty());
}

#[tokio::test]
async fn tool_loop_is_bounded() {
    let tool_call = json!({
        "id": "msg_loop",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-haiku-20241022",
        "content": [{"type": "tool_use", "id": "toolu_loop", "name": "adder", "input": {"a": 1, "b": 1}}],
        "stop_reason": "tool_use",
        "stop_sequence": null,
        "usage": {"input_tokens": 3, "output_tokens": 2}
    });

    let vendor = MockVendor::start([
        MockReply::Json(tool_call.clone()),
        MockReply::Json(tool_call.clone()),
        MockReply::Json(tool_call),
    ])
    .await;

    let config = integration_tests::provider_config("anthropic", &vendor.url("/v1"));
    let service = LlmService::from_config(&config.llm).unwrap().max_iterations(2);

    let error = service
        .chat_with_tools(request(None), &tools::executor(), &ToolContext::new())
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "Tool loop exceeded max iterations (2)");
    assert_eq!(vendor.requests().len(), 2);
}

use async_trait::async_trait;
use config::ApiProviderConfig;
use reqwest::{Client, header::AUTHORIZATION};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LlmError, LlmResult},
    messages::{
        openai::{OpenAiChunk, OpenAiRequest, OpenAiStreamOptions},
        unified::{UnifiedProvider, UnifiedRequest, UnifiedResponse, VendorResponse},
    },
    provider::{
        EventStream, Provider, http_client::default_http_client_builder, read_json, send_json, sse_events,
        until_cancelled,
    },
    stream::StreamEvent,
};

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Adapter for the OpenAI Chat Completions API and compatible servers.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    name: String,
    config: ApiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(name: String, config: ApiProviderConfig) -> LlmResult<Self> {
        let client = default_http_client_builder(Default::default()).build().map_err(|e| {
            log::error!("Failed to create HTTP client for OpenAI provider: {e}");
            LlmError::InternalError(None)
        })?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_API_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            name,
            config,
        })
    }

    fn request_builder(&self) -> LlmResult<reqwest::RequestBuilder> {
        let Some(api_key) = self.config.api_key.as_ref() else {
            return Err(LlmError::AuthenticationFailed(format!(
                "No API key configured for provider '{}'",
                self.name
            )));
        };

        let url = format!("{}/chat/completions", self.base_url);

        Ok(self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret())))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn provider(&self) -> UnifiedProvider {
        UnifiedProvider::OpenAi
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn chat(&self, request: &UnifiedRequest) -> LlmResult<UnifiedResponse> {
        let mut openai_request = OpenAiRequest::try_from(request)?;
        openai_request.stream = None;
        openai_request.stream_options = None;

        log::debug!(
            "Sending OpenAI request for model {} with {} message(s)",
            openai_request.model,
            openai_request.messages.len()
        );

        let response = send_json("OpenAI", self.request_builder()?, &openai_request).await?;
        let body = read_json("OpenAI", response).await?;

        UnifiedResponse::try_from(VendorResponse::OpenAi(body))
    }

    async fn stream(&self, request: &UnifiedRequest, cancel: CancellationToken) -> LlmResult<EventStream> {
        let mut openai_request = OpenAiRequest::try_from(request)?;
        openai_request.stream = Some(true);
        openai_request.stream_options = Some(OpenAiStreamOptions { include_usage: true });

        log::debug!("Opening OpenAI stream for model {}", openai_request.model);

        let response = send_json("OpenAI", self.request_builder()?, &openai_request).await?;

        Ok(until_cancelled(sse_events("OpenAI", response, parse_chunk), cancel))
    }
}

fn parse_chunk(data: &str) -> Option<StreamEvent> {
    if data.trim() == "[DONE]" {
        return None;
    }

    match sonic_rs::from_str::<OpenAiChunk>(data) {
        Ok(chunk) => Some(StreamEvent::OpenAi(chunk)),
        Err(e) => {
            log::warn!("Failed to parse OpenAI streaming chunk: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_marker_is_skipped() {
        assert!(parse_chunk("[DONE]").is_none());
    }

    #[test]
    fn chunks_are_parsed() {
        let data = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,"model":"gpt-4o","choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#;

        let Some(StreamEvent::OpenAi(chunk)) = parse_chunk(data) else {
            unreachable!("expected an OpenAI chunk");
        };

        assert_eq!(chunk.first_message().and_then(|message| message.content.as_deref()), Some("Hi"));
    }

    #[test]
    fn missing_api_key_is_unavailable() {
        let config = ApiProviderConfig {
            api_key: None,
            base_url: None,
        };

        let provider = OpenAiProvider::new("openai".to_string(), config).unwrap();

        assert!(!provider.is_available());
        assert!(matches!(provider.request_builder(), Err(LlmError::AuthenticationFailed(_))));
    }
}

use async_trait::async_trait;
use config::ApiProviderConfig;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue},
};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LlmError, LlmResult},
    messages::{
        anthropic::{AnthropicRequest, AnthropicStreamEvent},
        unified::{UnifiedProvider, UnifiedRequest, UnifiedResponse, VendorResponse},
    },
    provider::{
        EventStream, Provider, http_client::default_http_client_builder, read_json, send_json, sse_events,
        until_cancelled,
    },
    stream::StreamEvent,
};

const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Adapter for the Anthropic Messages API.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    name: String,
    config: ApiProviderConfig,
}

impl AnthropicProvider {
    pub fn new(name: String, config: ApiProviderConfig) -> LlmResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let client = default_http_client_builder(headers).build().map_err(|e| {
            log::error!("Failed to create HTTP client for Anthropic provider: {e}");
            LlmError::InternalError(None)
        })?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_ANTHROPIC_API_URL)
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

        let url = format!("{}/messages", self.base_url);

        Ok(self.client.post(url).header("x-api-key", api_key.expose_secret()))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider(&self) -> UnifiedProvider {
        UnifiedProvider::Anthropic
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn chat(&self, request: &UnifiedRequest) -> LlmResult<UnifiedResponse> {
        let mut anthropic_request = AnthropicRequest::try_from(request)?;
        anthropic_request.stream = None;

        log::debug!(
            "Sending Anthropic request for model {} with {} message(s)",
            anthropic_request.model,
            anthropic_request.messages.len()
        );

        let response = send_json("Anthropic", self.request_builder()?, &anthropic_request).await?;
        let body = read_json("Anthropic", response).await?;

        UnifiedResponse::try_from(VendorResponse::Anthropic(body))
    }

    async fn stream(&self, request: &UnifiedRequest, cancel: CancellationToken) -> LlmResult<EventStream> {
        let mut anthropic_request = AnthropicRequest::try_from(request)?;
        anthropic_request.stream = Some(true);

        log::debug!("Opening Anthropic stream for model {}", anthropic_request.model);

        let response = send_json("Anthropic", self.request_builder()?, &anthropic_request).await?;

        Ok(until_cancelled(sse_events("Anthropic", response, parse_event), cancel))
    }
}

fn parse_event(data: &str) -> Option<StreamEvent> {
    match sonic_rs::from_str::<AnthropicStreamEvent>(data) {
        Ok(event) => Some(StreamEvent::Anthropic(event)),
        Err(e) => {
            log::warn!("Failed to parse Anthropic streaming event: {e}");
            None
        }
    }
}

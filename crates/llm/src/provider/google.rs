use async_trait::async_trait;
use config::ApiProviderConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LlmError, LlmResult},
    messages::{
        google::{GoogleGenerateRequest, GoogleGenerateResponse},
        unified::{UnifiedProvider, UnifiedRequest, UnifiedResponse, VendorResponse},
    },
    provider::{
        EventStream, Provider, http_client::default_http_client_builder, read_json, send_json, sse_events,
        until_cancelled,
    },
    stream::StreamEvent,
};

const DEFAULT_GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Adapter for the Gemini GenerateContent API.
pub struct GoogleProvider {
    client: Client,
    base_url: String,
    name: String,
    config: ApiProviderConfig,
}

impl GoogleProvider {
    pub fn new(name: String, config: ApiProviderConfig) -> LlmResult<Self> {
        let client = default_http_client_builder(Default::default()).build().map_err(|e| {
            log::error!("Failed to create HTTP client for Google provider: {e}");
            LlmError::InternalError(None)
        })?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_GOOGLE_API_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            name,
            config,
        })
    }

    /// `{base}/models/{model}:{method}`, accepting model names with or without the `models/` prefix.
    fn url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);

        format!("{}/models/{model}:{method}", self.base_url)
    }

    fn request_builder(&self, url: String) -> LlmResult<reqwest::RequestBuilder> {
        let Some(api_key) = self.config.api_key.as_ref() else {
            return Err(LlmError::AuthenticationFailed(format!(
                "No API key configured for provider '{}'",
                self.name
            )));
        };

        Ok(self.client.post(url).header("x-goog-api-key", api_key.expose_secret()))
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn provider(&self) -> UnifiedProvider {
        UnifiedProvider::Google
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn chat(&self, request: &UnifiedRequest) -> LlmResult<UnifiedResponse> {
        let google_request = GoogleGenerateRequest::try_from(request)?;
        let url = self.url(&request.model, "generateContent");

        log::debug!(
            "Sending Google request for model {} with {} content item(s)",
            request.model,
            google_request.contents.len()
        );

        let response = send_json("Google", self.request_builder(url)?, &google_request).await?;
        let body = read_json("Google", response).await?;

        UnifiedResponse::try_from(VendorResponse::Google(body))
    }

    async fn stream(&self, request: &UnifiedRequest, cancel: CancellationToken) -> LlmResult<EventStream> {
        let google_request = GoogleGenerateRequest::try_from(request)?;
        let url = self.url(&request.model, "streamGenerateContent?alt=sse");

        log::debug!("Opening Google stream for model {}", request.model);

        let response = send_json("Google", self.request_builder(url)?, &google_request).await?;

        Ok(until_cancelled(sse_events("Google", response, parse_chunk), cancel))
    }
}

fn parse_chunk(data: &str) -> Option<StreamEvent> {
    match sonic_rs::from_str::<GoogleGenerateResponse>(data) {
        Ok(chunk) => Some(StreamEvent::Google(chunk)),
        Err(e) => {
            log::warn!("Failed to parse Google streaming chunk: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn provider(base_url: Option<&str>) -> GoogleProvider {
        let config = ApiProviderConfig {
            api_key: Some(SecretString::from("key")),
            base_url: base_url.map(str::to_string),
        };

        GoogleProvider::new("gemini".to_string(), config).unwrap()
    }

    #[test]
    fn urls() {
        let provider = provider(None);

        assert_eq!(
            provider.url("gemini-1.5-pro", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );

        assert_eq!(
            provider.url("models/gemini-1.5-flash", "streamGenerateContent?alt=sse"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:streamGenerateContent?alt=sse"
        );

        let provider = self::provider(Some("http://127.0.0.1:9000/v1beta/"));

        assert_eq!(
            provider.url("gemini-pro", "generateContent"),
            "http://127.0.0.1:9000/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn chunks_are_parsed() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"}]}}],"modelVersion":"gemini-1.5-pro"}"#;

        assert!(matches!(parse_chunk(data), Some(StreamEvent::Google(_))));
        assert!(parse_chunk("{").is_none());
    }
}

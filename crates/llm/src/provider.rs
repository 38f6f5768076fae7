//! Provider adapters.
//!
//! An adapter owns the transport to one vendor. It converts a [`UnifiedRequest`] into
//! the vendor wire format, performs the call and hands back either a [`UnifiedResponse`]
//! or a stream of typed [`StreamEvent`]s for the aggregator.

mod anthropic;
mod google;
mod http_client;
mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::{RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

pub use self::{anthropic::AnthropicProvider, google::GoogleProvider, openai::OpenAiProvider};

use crate::{
    error::{LlmError, LlmResult},
    messages::unified::{UnifiedProvider, UnifiedRequest, UnifiedResponse},
    stream::StreamEvent,
};

/// Events of one streamed response, in arrival order.
pub type EventStream = Pin<Box<dyn Stream<Item = LlmResult<StreamEvent>> + Send>>;

/// Contract every adapter implements.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> UnifiedProvider;

    /// Name of the adapter, as configured.
    fn name(&self) -> &str;

    /// Whether the adapter has what it needs to send requests, such as credentials.
    fn is_available(&self) -> bool {
        true
    }

    /// Sends one request and returns the complete response.
    async fn chat(&self, request: &UnifiedRequest) -> LlmResult<UnifiedResponse>;

    /// Sends one request and returns the vendor events as they arrive.
    ///
    /// The stream ends early once `cancel` fires.
    async fn stream(&self, request: &UnifiedRequest, cancel: CancellationToken) -> LlmResult<EventStream>;
}

/// Serializes `body` and sends it as JSON.
pub async fn send_json<T: Serialize>(
    vendor: &str,
    request_builder: RequestBuilder,
    body: &T,
) -> LlmResult<Response> {
    let body =
        sonic_rs::to_vec(body).map_err(|e| LlmError::InvalidRequest(format!("Failed to serialize request: {e}")))?;

    let response = request_builder
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| LlmError::ConnectionError(format!("Failed to send request to {vendor}: {e}")))?;

    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    log::error!("{vendor} API error ({status}): {error_text}");

    Err(status_error(status.as_u16(), error_text))
}

/// Maps an upstream HTTP status to an error.
pub fn status_error(status: u16, message: String) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed(message),
        403 => LlmError::InsufficientQuota(message),
        404 => LlmError::ModelNotFound(message),
        429 => LlmError::RateLimitExceeded { message },
        400 => LlmError::InvalidRequest(message),
        500 => LlmError::InternalError(Some(message)),
        _ => LlmError::ProviderApiError { status, message },
    }
}

/// Reads and parses a complete JSON response body.
pub async fn read_json<T: DeserializeOwned>(vendor: &str, response: Response) -> LlmResult<T> {
    let response_text = response.text().await.map_err(|e| {
        log::error!("Failed to read {vendor} response body: {e}");
        LlmError::InternalError(None)
    })?;

    sonic_rs::from_str(&response_text).map_err(|e| {
        log::error!("Failed to parse {vendor} response: {e}");
        log::debug!("Response parsing failed, length: {} bytes", response_text.len());

        LlmError::InternalError(None)
    })
}

/// Turns a server-sent event body into typed events.
///
/// `parse` receives the data of each event and returns `None` for events to skip.
/// Malformed events are logged and skipped, transport failures end up in the stream.
pub(crate) fn sse_events(
    vendor: &'static str,
    response: Response,
    parse: fn(&str) -> Option<StreamEvent>,
) -> impl Stream<Item = LlmResult<StreamEvent>> + Send + 'static {
    response.bytes_stream().eventsource().filter_map(move |event| {
        let item = match event {
            Ok(event) => parse(&event.data).map(Ok),
            Err(EventStreamError::Transport(e)) => Some(Err(LlmError::ConnectionError(format!(
                "{vendor} stream interrupted: {e}"
            )))),
            Err(e) => {
                log::warn!("SSE parsing error in {vendor} stream: {e}");
                None
            }
        };

        futures::future::ready(item)
    })
}

/// Cuts `stream` short once `cancel` fires.
pub(crate) fn until_cancelled<S>(stream: S, cancel: CancellationToken) -> EventStream
where
    S: Stream<Item = LlmResult<StreamEvent>> + Send + 'static,
{
    Box::pin(stream.take_until(cancel.cancelled_owned()))
}

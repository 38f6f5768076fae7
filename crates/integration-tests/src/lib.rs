pub mod tools;

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use config::Config;
use llm::ToolContext;
use mcp::McpToolExecutor;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A router served on a random local port until dropped.
pub struct TestServer {
    address: SocketAddr,
    shutdown: CancellationToken,
}

impl TestServer {
    pub async fn spawn(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone().cancelled_owned();

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(signal).await {
                log::error!("Test server on {address} failed: {e}");
            }
        });

        Self { address, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.address)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A canned reply of a [`MockVendor`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    /// A raw `text/event-stream` body.
    Sse(String),
    Status(u16, Value),
}

impl MockReply {
    /// Data-only server-sent events, as OpenAI and Gemini stream them.
    pub fn sse(events: &[Value]) -> Self {
        let body = events.iter().map(|event| format!("data: {event}\n\n")).collect();
        Self::Sse(body)
    }

    /// Named server-sent events, as Anthropic streams them.
    pub fn named_sse(events: &[Value]) -> Self {
        let body = events
            .iter()
            .map(|event| {
                let name = event["type"].as_str().unwrap_or("message");
                format!("event: {name}\ndata: {event}\n\n")
            })
            .collect();

        Self::Sse(body)
    }
}

/// A request received by a [`MockVendor`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path and query.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A vendor API answering every request with the next scripted reply.
pub struct MockVendor {
    server: TestServer,
    state: Arc<MockState>,
}

impl MockVendor {
    pub async fn start(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let state = Arc::new(MockState {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        });

        let router = Router::new().fallback(reply).with_state(state.clone());
        let server = TestServer::spawn(router).await;

        Self { server, state }
    }

    pub fn url(&self, path: &str) -> String {
        self.server.url(path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn reply(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);

    state.requests.lock().unwrap().push(RecordedRequest {
        uri: uri.to_string(),
        headers,
        body,
    });

    let next = state.replies.lock().unwrap().pop_front();

    match next {
        Some(MockReply::Json(body)) => Json(body).into_response(),
        Some(MockReply::Sse(body)) => ([(CONTENT_TYPE, "text/event-stream")], body).into_response(),
        Some(MockReply::Status(status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(body)).into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "no scripted reply left"}})),
        )
            .into_response(),
    }
}

/// Serves `tools/call` on `/mcp`.
pub async fn spawn_mcp(executor: McpToolExecutor) -> TestServer {
    let router = Router::new()
        .route("/mcp", post(handle_mcp))
        .with_state(Arc::new(executor));

    TestServer::spawn(router).await
}

async fn handle_mcp(State(executor): State<Arc<McpToolExecutor>>, body: String) -> impl IntoResponse {
    Json(executor.handle_raw(&body, &ToolContext::new()).await)
}

/// A configuration with one provider of `provider_type` pointing at `base_url`.
pub fn provider_config(provider_type: &str, base_url: &str) -> Config {
    let config = indoc::formatdoc! {r#"
        [llm.providers.mock]
        type = "{provider_type}"
        api_key = "test-key"
        base_url = "{base_url}"

        [tools]
        max_iterations = 5
    "#};

    Config::from_toml(&config).unwrap()
}

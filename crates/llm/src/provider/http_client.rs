use std::time::Duration;

use reqwest::{
    Client,
    header::{CONNECTION, HeaderMap, HeaderValue},
};

/// Client builder shared by every HTTP adapter, with `headers` sent on each request.
pub(super) fn default_http_client_builder(mut headers: HeaderMap) -> reqwest::ClientBuilder {
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(Duration::from_secs(60))
        // Idle connections are dropped quickly so that DNS changes are picked up.
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
}

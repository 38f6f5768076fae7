use thiserror::Error;

use crate::messages::unified::UnifiedProvider;

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Errors of the translation layer, the adapters and the tool loop.
#[derive(Debug, Error)]
pub enum LlmError {
    /// A content block cannot be expressed in the target vendor format.
    ///
    /// Raised before any network call.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// A response cannot be converted back because its origin is unknown.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// No adapter is registered for the requested provider.
    #[error("No adapter registered for provider: {0}")]
    NoAdapter(UnifiedProvider),

    /// The adapter exists but lacks credentials or an endpoint.
    #[error("Adapter for {0} is not available")]
    ProviderNotAvailable(UnifiedProvider),

    /// The tool loop did not reach a terminal response within its bound.
    #[error("Tool loop exceeded max iterations ({0})")]
    ToolLoopExceeded(u32),

    /// Model not found at the provider.
    #[error("{0}")]
    ModelNotFound(String),

    /// Authentication failed (missing or invalid API key).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    /// Insufficient quota or credits.
    #[error("Insufficient quota: {0}")]
    InsufficientQuota(String),

    /// The adapter cannot stream.
    #[error("Streaming is not supported by this provider")]
    StreamingNotSupported,

    /// The caller cancelled a stream before it completed.
    #[error("Stream cancelled")]
    Cancelled,

    /// Provider API returned an error.
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Internal error.
    /// If Some(message), it came from a provider and can be shown.
    /// If None, details were logged and are not repeated.
    #[error("Internal error")]
    InternalError(Option<String>),
}

impl LlmError {
    /// Message of the error, preferring the provider's own message for internal errors.
    pub fn client_message(&self) -> String {
        match self {
            Self::InternalError(Some(provider_msg)) => provider_msg.clone(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let errors = [
            LlmError::UnsupportedContentType("image".to_string()),
            LlmError::NoAdapter(UnifiedProvider::Google),
            LlmError::ProviderNotAvailable(UnifiedProvider::OpenAi),
            LlmError::ToolLoopExceeded(5),
            LlmError::InternalError(Some("upstream exploded".to_string())),
            LlmError::InternalError(None),
        ];

        let messages: Vec<_> = errors.iter().map(LlmError::client_message).collect();

        insta::assert_debug_snapshot!(messages, @r#"
        [
            "Unsupported content type: image",
            "No adapter registered for provider: google",
            "Adapter for openai is not available",
            "Tool loop exceeded max iterations (5)",
            "upstream exploded",
            "Internal error",
        ]
        "#);
    }
}

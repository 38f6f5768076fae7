use thiserror::Error;

use crate::types::{ErrorCode, JsonRpcError};

/// A JSON-RPC level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("MCP error {code}: {message}")]
pub struct McpError {
    pub code: ErrorCode,
    pub message: String,
}

impl McpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::METHOD_NOT_FOUND, format!("Method {method} not found"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INTERNAL_ERROR, message)
    }

    pub fn tool_not_found(name: &str) -> Self {
        Self::new(ErrorCode::TOOL_NOT_FOUND, format!("Tool {name} not found"))
    }
}

impl From<McpError> for JsonRpcError {
    fn from(error: McpError) -> Self {
        Self {
            code: error.code,
            message: error.message,
            data: None,
        }
    }
}

impl From<JsonRpcError> for McpError {
    fn from(error: JsonRpcError) -> Self {
        Self::new(error.code, error.message)
    }
}

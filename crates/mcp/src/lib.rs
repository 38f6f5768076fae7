//! JSON-RPC 2.0 tool invocation.
//!
//! A `tools/call` request names one tool and its arguments. [`McpToolExecutor`] serves
//! such requests from a [`llm::ToolExecutor`], and [`McpProvider`] sends them to a remote
//! endpoint so a pending tool call can be answered like any other chat request.

mod convert;
mod error;
mod executor;
mod provider;
mod types;

pub use convert::{mcp_response_to_unified, unified_to_mcp_request};
pub use error::McpError;
pub use executor::McpToolExecutor;
pub use provider::McpProvider;
pub use types::{
    ErrorCode, JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpContent, McpToolCallParams,
    McpToolResult, RequestId, TOOLS_CALL,
};

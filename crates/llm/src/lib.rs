//! One chat and tool-calling interface over the Anthropic, OpenAI and Google APIs.
//!
//! Requests and responses are expressed in the unified representation of
//! [`messages::unified`]. Adapters in [`provider`] translate them to each vendor's wire
//! format, [`stream`] folds vendor event streams back into a single response, and
//! [`tool`] runs the tools a model asks for until it produces a final answer.

mod error;
pub mod messages;
pub mod provider;
pub mod request;
mod service;
pub mod stream;
pub mod tool;

pub use error::{LlmError, LlmResult};
pub use messages::unified::{
    JsonObject, UnifiedContent, UnifiedContentContainer, UnifiedMessage, UnifiedProvider, UnifiedRequest,
    UnifiedResponse, UnifiedRole, UnifiedStopReason, UnifiedTool, UnifiedToolParameters, UnifiedToolResult,
    UnifiedToolUse, UnifiedUsage, VendorResponse,
};
pub use provider::{AnthropicProvider, EventStream, GoogleProvider, OpenAiProvider, Provider};
pub use request::UnifiedRequestBuilder;
pub use service::LlmService;
pub use stream::{StreamAggregator, StreamEvent, aggregate};
pub use tool::{
    DefaultResolver, ParamDescriptor, Refresh, ToolArguments, ToolContext, ToolDefinition, ToolExecutor, ToolHandler,
    ToolLoop, ToolOutput, ToolRegistry, ToolResolver, ToolResult,
};

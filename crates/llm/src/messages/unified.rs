//! Protocol-agnostic unified message types for LLM interactions.
//!
//! This module provides the intermediate representation every provider works with.
//! Requests are built once in this format and converted into the vendor wire format
//! right before dispatch. Responses from every vendor are normalized into
//! [`UnifiedResponse`], which keeps the verbatim vendor payload around so that
//! the reverse conversion is lossless.
//!
//! ## Architecture
//!
//! ```text
//! UnifiedRequest → vendor request → HTTP → vendor response → UnifiedResponse
//!                                        ↘ vendor events  → StreamAggregator → UnifiedResponse
//! ```
//!
//! ## Key Design Decisions
//!
//! - **Content containers**: Support both simple strings and ordered content blocks
//! - **Closed enums**: Roles, stop reasons and providers are exhaustive, unmapped vendor
//!   values fall back to a documented default
//! - **Side channels**: Vendor-only fields live under `_anthropic`, `_openai` and `_google`
//!   and are never needed for forward conversions

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{anthropic, google, openai};
use crate::error::{LlmError, LlmResult};

pub(crate) mod from_anthropic;
pub(crate) mod from_google;
pub(crate) mod from_openai;
pub(crate) mod reverse;
pub(crate) mod to_anthropic;
pub(crate) mod to_google;
pub(crate) mod to_openai;

/// A JSON object, the shape of tool arguments and tool parameter properties.
pub type JsonObject = Map<String, Value>;

/// Unified request representation for all LLM protocols.
///
/// Treated as a value: transformers borrow it and derive a vendor request, the tool
/// loop derives a new request with extra messages for every round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRequest {
    /// Model identifier, sent verbatim to the vendor.
    ///
    /// Examples:
    /// - `"claude-3-5-sonnet-20241022"` (Anthropic)
    /// - `"gpt-4o"` (OpenAI)
    /// - `"gemini-1.5-pro"` (Google)
    pub model: String,

    /// System instruction/prompt.
    ///
    /// Different providers handle system prompts differently:
    ///
    /// - **Anthropic**: Uses the dedicated "system" field in the API
    /// - **OpenAI**: Prepended as a message with role "system"
    /// - **Google**: Converted to the "systemInstruction" field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Conversation messages, in order.
    ///
    /// A request is only dispatched with at least one message.
    pub messages: Vec<UnifiedMessage>,

    /// Tools the model may call.
    ///
    /// Also known as:
    /// - **OpenAI**: "tools" with a nested "function"
    /// - **Anthropic**: "tools" with an "input_schema"
    /// - **Google**: "functionDeclarations"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<UnifiedTool>>,

    /// Maximum tokens to generate in the response.
    ///
    /// Anthropic requires this field and gets 4096 when it is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for randomness in generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p nucleus sampling cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling (number of tokens to consider).
    ///
    /// Supported by Anthropic and Google, ignored by OpenAI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Sequences that halt generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Whether to stream the response incrementally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Which provider should serve this request.
    ///
    /// When absent, the service picks the first available adapter.
    #[serde(default, rename = "_provider", skip_serializing_if = "Option::is_none")]
    pub provider: Option<UnifiedProvider>,
}

/// Unified message representation for conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedMessage {
    /// Role of the message sender.
    pub role: UnifiedRole,

    /// Message content, either plain text or ordered content blocks.
    ///
    /// Ordering of blocks is significant: they are rendered in sequence.
    pub content: UnifiedContentContainer,
}

impl UnifiedMessage {
    /// A plain text message with the given role.
    pub fn text(role: UnifiedRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: UnifiedContentContainer::Text(text.into()),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(UnifiedRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(UnifiedRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(UnifiedRole::Assistant, text)
    }

    /// A message made of content blocks.
    pub fn blocks(role: UnifiedRole, blocks: Vec<UnifiedContent>) -> Self {
        Self {
            role,
            content: UnifiedContentContainer::Blocks(blocks),
        }
    }

    /// Iterate over the tool use blocks of this message.
    pub fn tool_uses(&self) -> impl Iterator<Item = &UnifiedToolUse> {
        self.content.blocks().iter().filter_map(|block| match block {
            UnifiedContent::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        })
    }
}

/// Container for message content with flexible representation.
///
/// The untagged serde attribute keeps plain text messages as JSON strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnifiedContentContainer {
    /// Simple text content.
    ///
    /// Example: `"What is the weather in Paris?"`
    Text(String),

    /// Ordered content blocks.
    ///
    /// Used for tool usage, reasoning traces and multi-modal content.
    Blocks(Vec<UnifiedContent>),
}

impl UnifiedContentContainer {
    /// Content blocks of the container, empty for plain text.
    pub fn blocks(&self) -> &[UnifiedContent] {
        match self {
            Self::Text(_) => &[],
            Self::Blocks(blocks) => blocks,
        }
    }

    /// All text of the container joined together.
    ///
    /// Text blocks are concatenated without separator; other blocks are skipped.
    pub fn joined_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks.iter().filter_map(UnifiedContent::as_text).collect(),
        }
    }
}

/// Message sender role in conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnifiedRole {
    /// System instructions that guide model behavior.
    ///
    /// Provider handling:
    /// - **OpenAI**: Kept as a leading message with role "system"
    /// - **Anthropic**: Appended to the request's `system` field
    /// - **Google**: Appended to the parts of "systemInstruction"
    System,

    /// User input messages.
    User,

    /// Assistant/model responses.
    Assistant,

    /// Tool response messages.
    ///
    /// Provider handling:
    /// - **OpenAI**: Separate "tool" role
    /// - **Anthropic**: Sent as a user message with tool_result blocks
    /// - **Google**: Role "function" with functionResponse parts
    Tool,
}

/// Content block types for complex messages.
///
/// The tagged enum gives every block a `type` discriminator in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedContent {
    /// Plain text content block.
    Text {
        /// The text content.
        text: String,
    },

    /// Vendor-specific reasoning trace.
    Thinking {
        /// The reasoning text.
        thinking: String,

        /// Opaque provenance token, empty string if the vendor sent none.
        #[serde(default)]
        signature: String,
    },

    /// Tool use request from the assistant.
    ToolUse(UnifiedToolUse),

    /// Tool execution result.
    ToolResult(UnifiedToolResult),

    /// Image content for multi-modal interactions.
    Image {
        /// Image data source.
        source: UnifiedImageSource,
    },
}

impl UnifiedContent {
    /// Get the text content if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            UnifiedContent::Text { text } => Some(text),
            _ => None,
        }
    }

    /// The `type` discriminator of this block, as used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            UnifiedContent::Text { .. } => "text",
            UnifiedContent::Thinking { .. } => "thinking",
            UnifiedContent::ToolUse(_) => "tool_use",
            UnifiedContent::ToolResult(_) => "tool_result",
            UnifiedContent::Image { .. } => "image",
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        UnifiedContent::Text { text: text.into() }
    }
}

/// A vendor-issued request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedToolUse {
    /// Unique identifier for this tool call, correlates with a later tool result.
    pub id: String,

    /// Name of the tool to execute.
    pub name: String,

    /// Arguments for the tool.
    ///
    /// Absent when streamed arguments could not be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonObject>,
}

/// Outcome of a tool invocation, fed back into the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedToolResult {
    /// ID of the tool use this result responds to.
    pub tool_use_id: String,

    /// Name of the tool that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// The tool's output.
    pub content: String,

    /// Whether the tool execution resulted in an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl UnifiedToolResult {
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// Image source for multi-modal content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedImageSource {
    /// Source kind, e.g. `"base64"` or `"url"`.
    #[serde(rename = "type")]
    pub source_type: String,

    /// MIME type of the image, e.g. `"image/png"`.
    pub media_type: String,

    /// Image payload or URL.
    pub data: String,
}

/// Tool definition for model capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedTool {
    /// Tool name, unique among the tools of a request.
    pub name: String,

    /// Human-readable description of what the tool does.
    pub description: String,

    /// Parameter schema.
    ///
    /// Example:
    /// ```json
    /// {
    ///   "type": "object",
    ///   "properties": {
    ///     "location": {"type": "string", "description": "City name"}
    ///   },
    ///   "required": ["location"]
    /// }
    /// ```
    pub parameters: UnifiedToolParameters,
}

/// JSON-Schema object describing the arguments of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedToolParameters {
    /// Always `"object"`.
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,

    /// Property name to property schema.
    #[serde(default)]
    pub properties: JsonObject,

    /// Names of the required properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl Default for UnifiedToolParameters {
    fn default() -> Self {
        Self {
            schema_type: object_type(),
            properties: JsonObject::new(),
            required: None,
        }
    }
}

impl UnifiedToolParameters {
    /// The parameters as a plain JSON-Schema value.
    pub fn to_value(&self) -> Value {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), Value::String(self.schema_type.clone()));
        schema.insert("properties".to_string(), Value::Object(self.properties.clone()));

        if let Some(required) = &self.required {
            schema.insert(
                "required".to_string(),
                Value::Array(required.iter().cloned().map(Value::String).collect()),
            );
        }

        Value::Object(schema)
    }
}

fn object_type() -> String {
    "object".to_string()
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedUsage {
    /// Number of tokens in the input/prompt.
    pub input_tokens: u32,

    /// Number of tokens generated by the model.
    pub output_tokens: u32,

    /// Total tokens consumed, when the vendor reports or implies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,

    #[serde(default, rename = "_anthropic", skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<AnthropicUsageExtras>,

    #[serde(default, rename = "_openai", skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiUsageExtras>,

    #[serde(default, rename = "_google", skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleUsageExtras>,
}

/// Anthropic-only usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnthropicUsageExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,
}

/// OpenAI-only usage breakdowns, kept opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiUsageExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<Value>,
}

/// Google-only usage metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUsageExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<Vec<google::GoogleTokenDetails>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_tokens_details: Option<Vec<google::GoogleTokenDetails>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts_token_count: Option<u32>,
}

/// Unified response from an LLM completion.
///
/// Produced once per adapter call or per fully aggregated stream, and not
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResponse {
    /// Unique identifier of the completion, if the vendor sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Model that generated the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Always [`UnifiedRole::Assistant`].
    pub role: UnifiedRole,

    /// Ordered content blocks of the response.
    pub content: Vec<UnifiedContent>,

    /// Why the model stopped generating.
    pub stop_reason: UnifiedStopReason,

    /// Token usage statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UnifiedUsage>,

    /// The provider that produced this response.
    #[serde(default, rename = "_provider", skip_serializing_if = "Option::is_none")]
    pub provider: Option<UnifiedProvider>,

    /// The vendor payload this response was converted from, exactly as received.
    ///
    /// When present, [`UnifiedResponse::to_original`] returns it unchanged.
    #[serde(default, rename = "_original", skip_serializing_if = "Option::is_none")]
    pub original: Option<Value>,

    #[serde(default, rename = "_anthropic", skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<AnthropicResponseExtras>,

    #[serde(default, rename = "_openai", skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiResponseExtras>,

    #[serde(default, rename = "_google", skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleResponseExtras>,
}

impl UnifiedResponse {
    /// An empty assistant response, the seed of stream aggregation.
    pub fn empty() -> Self {
        Self {
            id: None,
            model: None,
            role: UnifiedRole::Assistant,
            content: Vec::new(),
            stop_reason: UnifiedStopReason::EndTurn,
            usage: None,
            provider: None,
            original: None,
            anthropic: None,
            openai: None,
            google: None,
        }
    }

    /// Iterate over the tool use blocks of the response, in order.
    pub fn tool_uses(&self) -> impl Iterator<Item = &UnifiedToolUse> {
        self.content.iter().filter_map(|block| match block {
            UnifiedContent::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        })
    }

    /// Whether the model asked for tools to be executed.
    pub fn requests_tools(&self) -> bool {
        self.stop_reason == UnifiedStopReason::ToolUse && self.tool_uses().next().is_some()
    }

    /// All text blocks joined together.
    pub fn text(&self) -> String {
        self.content.iter().filter_map(UnifiedContent::as_text).collect()
    }
}

/// Anthropic-only response fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnthropicResponseExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

/// OpenAI-only response fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiResponseExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

/// Google-only response fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleResponseExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Normalized reason why the model stopped generating.
///
/// Every vendor vocabulary maps onto exactly one of these. Unmapped vendor values
/// become [`UnifiedStopReason::EndTurn`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifiedStopReason {
    /// Natural completion of the assistant's turn.
    #[default]
    EndTurn,

    /// The model asked for one or more tools to be executed.
    ToolUse,

    /// Response truncated by the token limit.
    MaxTokens,

    /// A stop sequence from the request was generated.
    StopSequence,

    /// Content was blocked by the vendor's safety systems.
    ContentFilter,

    /// The vendor reported an error, typically mid-stream.
    Error,
}

impl fmt::Display for UnifiedStopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            UnifiedStopReason::EndTurn => "end_turn",
            UnifiedStopReason::ToolUse => "tool_use",
            UnifiedStopReason::MaxTokens => "max_tokens",
            UnifiedStopReason::StopSequence => "stop_sequence",
            UnifiedStopReason::ContentFilter => "content_filter",
            UnifiedStopReason::Error => "error",
        };

        f.write_str(value)
    }
}

/// Identity of the provider behind an adapter or a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnifiedProvider {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    Google,
    /// JSON-RPC tool invocation endpoint.
    Mcp,
}

impl UnifiedProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnifiedProvider::Anthropic => "anthropic",
            UnifiedProvider::OpenAi => "openai",
            UnifiedProvider::Google => "google",
            UnifiedProvider::Mcp => "mcp",
        }
    }
}

impl fmt::Display for UnifiedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vendor response body as received, tagged with the vendor that sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum VendorResponse {
    Anthropic(Value),
    OpenAi(Value),
    Google(Value),
}

impl VendorResponse {
    pub fn provider(&self) -> UnifiedProvider {
        match self {
            VendorResponse::Anthropic(_) => UnifiedProvider::Anthropic,
            VendorResponse::OpenAi(_) => UnifiedProvider::OpenAi,
            VendorResponse::Google(_) => UnifiedProvider::Google,
        }
    }

    pub fn body(&self) -> &Value {
        match self {
            VendorResponse::Anthropic(body) | VendorResponse::OpenAi(body) | VendorResponse::Google(body) => body,
        }
    }

    pub fn into_body(self) -> Value {
        match self {
            VendorResponse::Anthropic(body) | VendorResponse::OpenAi(body) | VendorResponse::Google(body) => body,
        }
    }
}

/// Parses the body into the vendor's protocol type and converts it.
///
/// The body itself is kept untouched as `_original`, including any fields and
/// content blocks the protocol types do not model.
impl TryFrom<VendorResponse> for UnifiedResponse {
    type Error = LlmError;

    fn try_from(response: VendorResponse) -> Result<Self, Self::Error> {
        let mut unified: UnifiedResponse = match &response {
            VendorResponse::Anthropic(body) => parse_body::<anthropic::AnthropicResponse>("Anthropic", body)?.into(),
            VendorResponse::OpenAi(body) => parse_body::<openai::OpenAiResponse>("OpenAI", body)?.into(),
            VendorResponse::Google(body) => parse_body::<google::GoogleGenerateResponse>("Google", body)?.into(),
        };

        unified.original = Some(response.into_body());

        Ok(unified)
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(vendor: &str, body: &Value) -> LlmResult<T> {
    T::deserialize(body).map_err(|e| {
        log::error!("Failed to parse {vendor} response: {e}");
        LlmError::InternalError(None)
    })
}

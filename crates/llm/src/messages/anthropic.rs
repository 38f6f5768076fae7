use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for Anthropic Messages API.
///
/// This struct represents the request format for creating messages with Claude models
/// as documented in the [Anthropic API Reference](https://docs.anthropic.com/en/api/messages).
/// The format differs from OpenAI's format in several key ways:
/// - System prompts are separate from the messages array
/// - Message content is a string or an array of typed blocks
/// - Tool use has a different format (tool_use/tool_result vs function calls)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnthropicRequest {
    /// The model to use for the completion.
    ///
    /// Examples:
    /// - "claude-3-opus-20240229"
    /// - "claude-3-5-sonnet-20241022"
    pub model: String,

    /// The messages to send to the model.
    ///
    /// Messages alternate between "user" and "assistant" roles.
    pub messages: Vec<AnthropicMessage>,

    /// Maximum number of tokens to generate.
    ///
    /// Required for Anthropic API. Different models have different maximums.
    pub max_tokens: u32,

    /// System prompt to set context for the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Controls randomness in the response.
    ///
    /// Range: 0.0 to 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Only sample from the top K tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Sequences that will cause the model to stop generating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Whether to stream the response.
    ///
    /// When true, responses are sent as Server-Sent Events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Tools available for the model to use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
}

/// An Anthropic message with role and content.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnthropicMessage {
    /// The role of the message sender.
    pub role: AnthropicRole,

    /// The content of the message.
    pub content: AnthropicMessageContent,
}

/// Message content: either a plain string or an array of content blocks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnthropicMessageContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

/// Role of a message sender in Anthropic's API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnthropicRole {
    /// User message
    User,
    /// Assistant message
    Assistant,
}

/// Content block in an Anthropic message.
///
/// Used both in requests and responses.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    /// Plain text content.
    Text {
        /// The text content
        text: String,
    },

    /// Extended thinking output.
    Thinking {
        /// The reasoning text
        thinking: String,
        /// Signature verifying the thinking block, absent at stream start
        #[serde(default)]
        signature: String,
    },

    /// Tool use request from the assistant.
    ToolUse {
        /// Unique identifier for this tool use
        ///
        /// Format: "toolu_{alphanumeric}"
        id: String,
        /// Name of the tool to use
        name: String,
        /// Input parameters for the tool
        input: Value,
    },

    /// Result from a tool execution.
    ToolResult {
        /// The tool use ID this result corresponds to
        tool_use_id: String,
        /// The result content
        content: String,
        /// Whether the tool execution failed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },

    /// Any block type this crate does not model, e.g. `redacted_thinking`.
    #[serde(other)]
    Unsupported,
}

/// Tool definition for Anthropic.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnthropicTool {
    /// Name of the tool
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON schema for the tool's input parameters
    pub input_schema: AnthropicToolInputSchema,
}

/// Input schema of an Anthropic tool.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnthropicToolInputSchema {
    /// Always "object".
    #[serde(rename = "type")]
    pub schema_type: String,

    pub properties: serde_json::Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// The reason why the model stopped generating tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum AnthropicStopReason {
    /// The model reached a natural stopping point.
    #[serde(rename = "end_turn")]
    EndTurn,
    /// The generation exceeded the maximum token limit specified in the request.
    #[serde(rename = "max_tokens")]
    MaxTokens,
    /// The model encountered a stop sequence specified in the request.
    #[serde(rename = "stop_sequence")]
    StopSequence,
    /// The model invoked a tool.
    #[serde(rename = "tool_use")]
    ToolUse,
    /// Output blocked by content filtering.
    #[serde(rename = "content_filter")]
    ContentFilter,
    /// Any other stop reason not yet known.
    /// Captures the actual string value for forward compatibility.
    #[serde(untagged)]
    Other(String),
}

/// Response from Anthropic Messages API.
///
/// Also the payload of the `message_start` streaming event, where `content` is
/// empty and `stop_reason` is null.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnthropicResponse {
    /// Unique identifier for the message.
    pub id: String,

    /// Object type. Always "message" for message responses.
    #[serde(rename = "type")]
    pub response_type: String,

    /// Conversational role of the generated message.
    /// This will always be "assistant".
    pub role: AnthropicRole,

    /// The model that handled the request.
    pub model: String,

    /// Content blocks in the response.
    pub content: Vec<AnthropicContentBlock>,

    /// The reason the model stopped generating.
    pub stop_reason: Option<AnthropicStopReason>,

    /// Which custom stop sequence was triggered, if any.
    pub stop_sequence: Option<String>,

    /// Billing and rate limit usage information.
    pub usage: AnthropicUsage,
}

/// Token usage information for an Anthropic API request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AnthropicUsage {
    /// Number of tokens in the input prompt.
    #[serde(default)]
    pub input_tokens: u32,

    /// Number of tokens generated in the response.
    #[serde(default)]
    pub output_tokens: u32,

    /// Tokens written to the prompt cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u32>,

    /// Tokens read from the prompt cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,
}

/// Anthropic streaming event types.
///
/// Anthropic uses a more complex streaming format than OpenAI, with distinct event
/// types for different stages of message generation.
///
/// See: https://docs.anthropic.com/en/api/messages-streaming
///
/// Event flow for a typical streaming response:
/// 1. `message_start` - Initial message metadata with empty content
/// 2. `content_block_start` - Beginning of a content block
/// 3. `content_block_delta` - Incremental content updates (multiple)
/// 4. `content_block_stop` - End of the current content block
/// 5. `message_delta` - Final message metadata (stop reason, usage)
/// 6. `message_stop` - End of streaming
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    /// Initial message metadata including ID, model, and input token usage.
    MessageStart { message: AnthropicResponse },

    /// A new content block begins at `index`.
    ContentBlockStart {
        index: usize,
        content_block: AnthropicContentBlock,
    },

    /// Incremental update to the content block at `index`.
    ContentBlockDelta { index: usize, delta: AnthropicBlockDelta },

    /// No more deltas will be sent for this block index.
    ContentBlockStop { index: usize },

    /// Stop reason and final output token count.
    MessageDelta {
        delta: AnthropicMessageDelta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<AnthropicDeltaUsage>,
    },

    /// End of the streaming response.
    MessageStop,

    /// Keep-alive event, ignored.
    Ping,

    /// Error event. The stream ends after an error.
    Error { error: AnthropicStreamError },
}

/// Delta content for a content block.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicBlockDelta {
    /// Text fragment to append to a text block.
    TextDelta { text: String },

    /// Reasoning fragment to append to a thinking block.
    ThinkingDelta { thinking: String },

    /// Signature fragment of a thinking block.
    SignatureDelta { signature: String },

    /// Partial JSON string for tool arguments.
    ///
    /// Fragments are concatenated to build the complete arguments object.
    InputJsonDelta { partial_json: String },

    #[serde(other)]
    Unsupported,
}

/// Final message metadata delta.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AnthropicMessageDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<AnthropicStopReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
}

/// Usage reported in `message_delta`, where output tokens are final.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AnthropicDeltaUsage {
    pub output_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
}

/// Error information in streaming response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnthropicStreamError {
    /// Type of error that occurred.
    ///
    /// Common values:
    /// - "invalid_request_error": Problem with request parameters
    /// - "rate_limit_error": Too many requests
    /// - "api_error": Server-side error
    /// - "overloaded_error": Servers are overloaded
    #[serde(rename = "type")]
    pub error_type: String,

    /// Human-readable error message describing what went wrong.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn unknown_stop_reason_is_preserved() {
        let reason: AnthropicStopReason = serde_json::from_str(r#""pause_turn""#).unwrap();
        assert_eq!(reason, AnthropicStopReason::Other("pause_turn".to_string()));
        assert_eq!(serde_json::to_string(&reason).unwrap(), r#""pause_turn""#);
    }

    #[test]
    fn parses_stream_events() {
        let events = indoc! {r#"
            {"type":"message_start","message":{"id":"msg_1","type":"message","role":"assistant","model":"claude-3-5-sonnet-20241022","content":[],"stop_reason":null,"stop_sequence":null,"usage":{"input_tokens":25,"output_tokens":1}}}
            {"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}
            {"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"sig"}}
            {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"a\":"}}
            {"type":"message_delta","delta":{"stop_reason":"tool_use","stop_sequence":null},"usage":{"output_tokens":15}}
            {"type":"ping"}
        "#};

        let parsed: Vec<AnthropicStreamEvent> = events
            .lines()
            .map(|line| sonic_rs::from_str(line).unwrap())
            .collect();

        insta::assert_debug_snapshot!(parsed, @r#"
        [
            MessageStart {
                message: AnthropicResponse {
                    id: "msg_1",
                    response_type: "message",
                    role: Assistant,
                    model: "claude-3-5-sonnet-20241022",
                    content: [],
                    stop_reason: None,
                    stop_sequence: None,
                    usage: AnthropicUsage {
                        input_tokens: 25,
                        output_tokens: 1,
                        cache_creation_input_tokens: None,
                        cache_read_input_tokens: None,
                    },
                },
            },
            ContentBlockStart {
                index: 0,
                content_block: Thinking {
                    thinking: "",
                    signature: "",
                },
            },
            ContentBlockDelta {
                index: 0,
                delta: SignatureDelta {
                    signature: "sig",
                },
            },
            ContentBlockDelta {
                index: 1,
                delta: InputJsonDelta {
                    partial_json: "{\"a\":",
                },
            },
            MessageDelta {
                delta: AnthropicMessageDelta {
                    stop_reason: Some(
                        ToolUse,
                    ),
                    stop_sequence: None,
                },
                usage: Some(
                    AnthropicDeltaUsage {
                        output_tokens: 15,
                        input_tokens: None,
                    },
                ),
            },
            Ping,
        ]
        "#);
    }
}

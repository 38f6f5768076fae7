use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for OpenAI Chat Completions API.
///
/// See: https://platform.openai.com/docs/api-reference/chat/create
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiRequest {
    /// ID of the model to use, e.g. "gpt-4o".
    pub model: String,

    /// The messages of the conversation so far, system prompt included.
    pub messages: Vec<OpenAiMessage>,

    /// Maximum number of tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature between 0 and 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Up to 4 sequences where the API will stop generating further tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// If set, partial message deltas are sent as server-sent events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Options for streaming responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<OpenAiStreamOptions>,

    /// Tools the model may call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,
}

/// Streaming options of a chat completion request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiStreamOptions {
    /// Send a final chunk with token usage and no choices.
    pub include_usage: bool,
}

/// A message in an OpenAI conversation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiMessage {
    pub role: OpenAiRole,

    /// Text of the message. May be absent on assistant messages with tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,

    /// For role "tool": the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Role of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAiRole {
    System,
    User,
    Assistant,
    Tool,
    /// Any other role, e.g. "developer".
    #[serde(untagged)]
    Other(String),
}

/// A tool call, in a request, a full response or a streaming delta.
///
/// In streaming deltas only `index` is guaranteed. The first fragment of a call
/// carries `id` and the function name, later fragments only argument pieces.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpenAiToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Always "function".
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,

    pub function: OpenAiFunctionCall,
}

/// Function part of a tool call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpenAiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Arguments as a JSON-encoded string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Tool definition in a request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiTool {
    /// Always "function".
    #[serde(rename = "type")]
    pub tool_type: String,

    pub function: OpenAiFunction,
}

/// Function definition of a tool.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiFunction {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

/// Response of the Chat Completions API.
///
/// The same shape is used for the `chat.completion` object and for every
/// `chat.completion.chunk` of a stream. Full responses carry `message` in their
/// choices, chunks carry `delta`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiResponse {
    /// A unique identifier for the chat completion.
    pub id: String,

    /// "chat.completion" or "chat.completion.chunk".
    pub object: String,

    /// Unix timestamp (seconds) of creation.
    pub created: u64,

    /// The model used for the completion.
    pub model: String,

    /// Backend configuration fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,

    /// Completion choices. Empty in the final usage chunk of a stream.
    pub choices: Vec<OpenAiChoice>,

    /// Usage statistics, in full responses and the final stream chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAiUsage>,
}

/// Alias making intent clear at streaming call sites.
pub type OpenAiChunk = OpenAiResponse;

impl OpenAiResponse {
    /// The message of the first choice, `message` for full responses or `delta` for chunks.
    pub fn first_message(&self) -> Option<&OpenAiResponseMessage> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref().or(choice.delta.as_ref()))
    }

    pub fn first_finish_reason(&self) -> Option<&OpenAiFinishReason> {
        self.choices.first().and_then(|choice| choice.finish_reason.as_ref())
    }
}

/// A single completion choice.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiChoice {
    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<OpenAiResponseMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<OpenAiResponseMessage>,

    #[serde(default)]
    pub finish_reason: Option<OpenAiFinishReason>,
}

/// Assistant message of a response, or an incremental delta of one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpenAiResponseMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<OpenAiRole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Reasoning trace of reasoning models served behind OpenAI-compatible APIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
}

/// The reason why the model stopped generating tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenAiFinishReason {
    /// Natural stop point or a provided stop sequence.
    Stop,
    /// Maximum number of tokens reached.
    Length,
    /// Content omitted by content filters.
    ContentFilter,
    /// The model called a tool.
    ToolCalls,
    /// Legacy function calling.
    FunctionCall,
    /// Any other finish reason not yet known.
    #[serde(untagged)]
    Other(String),
}

/// Token usage of a completion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpenAiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_usage_only_chunk() {
        let chunk: OpenAiChunk = sonic_rs::from_str(
            r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1700000000,"model":"gpt-4o","system_fingerprint":null,"choices":[],"usage":{"prompt_tokens":9,"completion_tokens":12,"total_tokens":21}}"#,
        )
        .unwrap();

        assert!(chunk.first_message().is_none());
        assert_eq!(chunk.usage.map(|usage| usage.total_tokens), Some(21));
    }

    #[test]
    fn parses_tool_call_delta() {
        let chunk: OpenAiChunk = sonic_rs::from_str(
            r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1700000000,"model":"gpt-4o","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"a\":"}}]},"finish_reason":null}]}"#,
        )
        .unwrap();

        insta::assert_debug_snapshot!(chunk.first_message(), @r#"
        Some(
            OpenAiResponseMessage {
                role: None,
                content: None,
                reasoning_content: None,
                tool_calls: Some(
                    [
                        OpenAiToolCall {
                            index: Some(
                                0,
                            ),
                            id: None,
                            call_type: None,
                            function: OpenAiFunctionCall {
                                name: None,
                                arguments: Some(
                                    "{\"a\":",
                                ),
                            },
                        },
                    ],
                ),
            },
        )
        "#);
    }

    #[test]
    fn unknown_finish_reason_is_preserved() {
        let reason: OpenAiFinishReason = serde_json::from_str(r#""insufficient_system_resource""#).unwrap();
        assert_eq!(
            reason,
            OpenAiFinishReason::Other("insufficient_system_resource".to_string())
        );
    }
}

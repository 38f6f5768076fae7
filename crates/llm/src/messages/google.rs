use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for Google Gemini GenerateContent API.
///
/// This struct represents the request format for generating content with Gemini models
/// as documented in the [Google AI API Reference](https://ai.google.dev/api/generate-content).
/// The same body is sent to `generateContent` and `streamGenerateContent`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGenerateRequest {
    /// The content of the current conversation with the model.
    ///
    /// For single-turn queries, this is a single instance.
    /// For multi-turn queries, this is a repeated field that contains conversation history and the latest request.
    pub contents: Vec<GoogleContent>,

    /// Optional configuration for model generation and output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GoogleGenerationConfig>,

    /// Optional tool configurations for function calling.
    ///
    /// A list of Tools the model may use to generate the next response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GoogleTool>>,

    /// Optional system instruction (prompt).
    ///
    /// The system instruction is a more natural way to steer the behavior of the model
    /// than using examples in a prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GoogleContent>,
}

/// Configuration options for model generation and output.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGenerationConfig {
    /// The maximum number of tokens to include in a candidate.
    ///
    /// If unset, this will default to a value determined by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Controls randomness in generation.
    ///
    /// Values can range from 0.0 to 2.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// The maximum cumulative probability of tokens to consider when sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// The maximum number of tokens to consider when sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Set of character sequences that will stop output generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl GoogleGenerationConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Content of a conversation turn.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GoogleContent {
    /// The producer of the content. Absent for system instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<GoogleRole>,

    /// Ordered parts that constitute a single message.
    #[serde(default)]
    pub parts: Vec<GooglePart>,
}

/// Role of a content producer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoogleRole {
    User,
    Model,
    Function,
    #[serde(untagged)]
    Other(String),
}

/// A part of a content.
///
/// Gemini encodes the kind of a part by which field is set. A text part with
/// `thought: true` holds a reasoning summary.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GoogleFunctionCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<GoogleFunctionResponse>,

    /// Opaque signature the model attaches to function calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl GooglePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            function_call: Some(GoogleFunctionCall {
                name: name.into(),
                args,
            }),
            thought_signature: Some(String::new()),
            ..Default::default()
        }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            function_response: Some(GoogleFunctionResponse {
                name: name.into(),
                response,
            }),
            ..Default::default()
        }
    }

    /// Whether this part is a reasoning summary rather than answer text.
    pub fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

/// A function call predicted by the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GoogleFunctionCall {
    /// The name of the function to call.
    pub name: String,

    /// The function parameters and values in JSON object format.
    #[serde(default)]
    pub args: Value,
}

/// The result of a function call, sent back to the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GoogleFunctionResponse {
    /// The name of the function that was called.
    pub name: String,

    /// The function response in JSON object format, `{"content": ...}` by convention.
    pub response: Value,
}

/// Tool configuration for function calling.
///
/// Defines functions that the model can call to get additional information.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTool {
    /// A list of function declarations that the model can call.
    pub function_declarations: Vec<GoogleFunctionDeclaration>,
}

/// Declaration of a function that the model can call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GoogleFunctionDeclaration {
    /// The name of the function to call.
    pub name: String,

    /// Description of what the function does.
    pub description: String,

    /// The parameters of this function in the OpenAPI schema subset Gemini accepts.
    pub parameters: Value,
}

/// Response from Google Gemini GenerateContent API.
///
/// Every event of a `streamGenerateContent?alt=sse` stream has the same shape,
/// carrying only the newly generated parts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGenerateResponse {
    /// Candidate responses from the model.
    pub candidates: Vec<GoogleCandidate>,

    /// Metadata on the generation request's token usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<GoogleUsageMetadata>,

    /// The model version used to generate the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,

    /// Identifier of the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl GoogleGenerateResponse {
    /// Parts of the first candidate, empty if the candidate has no content.
    pub fn first_parts(&self) -> &[GooglePart] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    pub fn first_finish_reason(&self) -> Option<&GoogleFinishReason> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_ref())
    }
}

/// A response candidate generated from the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCandidate {
    /// Generated content. Missing when the candidate was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<GoogleContent>,

    /// The reason why the model stopped generating tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<GoogleFinishReason>,

    /// Index of the candidate in the list of candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// The reason why the model stopped generating tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoogleFinishReason {
    /// Natural stop point of the model or provided stop sequence.
    Stop,
    /// The maximum number of tokens as specified in the request was reached.
    MaxTokens,
    /// The candidate content was flagged for safety reasons.
    Safety,
    /// The candidate content was flagged for recitation reasons.
    Recitation,
    /// Any other finish reason, e.g. `BLOCKLIST` or `MALFORMED_FUNCTION_CALL`.
    #[serde(untagged)]
    Other(String),
}

/// Metadata on token usage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUsageMetadata {
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub prompt_token_count: u32,

    /// Total number of tokens across all generated candidates.
    #[serde(default)]
    pub candidates_token_count: u32,

    /// Total token count for the generation request.
    #[serde(default)]
    pub total_token_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<Vec<GoogleTokenDetails>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_tokens_details: Option<Vec<GoogleTokenDetails>>,

    /// Tokens spent on reasoning, for thinking models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts_token_count: Option<u32>,
}

/// Token count of one modality.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTokenDetails {
    /// e.g. "TEXT" or "IMAGE".
    pub modality: String,

    #[serde(default)]
    pub token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn part_kind_follows_set_field() {
        let parts: Vec<GooglePart> = serde_json::from_value(json!([
            {"text": "Hello"},
            {"text": "pondering", "thought": true},
            {"functionCall": {"name": "get_weather", "args": {"city": "Paris"}}, "thoughtSignature": "abc"}
        ]))
        .unwrap();

        assert!(!parts[0].is_thought());
        assert!(parts[1].is_thought());
        assert_eq!(parts[2].function_call.as_ref().map(|call| call.name.as_str()), Some("get_weather"));
    }

    #[test]
    fn function_call_part_carries_empty_signature() {
        let part = GooglePart::function_call("add", json!({"a": 1}));

        insta::assert_json_snapshot!(part, @r#"
        {
          "functionCall": {
            "name": "add",
            "args": {
              "a": 1
            }
          },
          "thoughtSignature": ""
        }
        "#);
    }

    #[test]
    fn blocked_candidate_has_no_parts() {
        let response: GoogleGenerateResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY", "index": 0}],
            "modelVersion": "gemini-1.5-pro"
        }))
        .unwrap();

        assert!(response.first_parts().is_empty());
        assert_eq!(response.first_finish_reason(), Some(&GoogleFinishReason::Safety));
    }
}

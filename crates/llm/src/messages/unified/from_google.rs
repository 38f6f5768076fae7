//! Conversions from Google Gemini protocol types to unified types.

use serde_json::Value;

use crate::messages::{google, unified};

/// Identifier given to the `n`-th function call of a response.
///
/// Gemini does not identify function calls, so ids are derived from their position.
pub(crate) fn function_call_id(n: usize) -> String {
    format!("google_fc_{n}")
}

impl From<google::GoogleGenerateResponse> for unified::UnifiedResponse {
    fn from(response: google::GoogleGenerateResponse) -> Self {
        let mut function_calls = 0;

        let content = response
            .first_parts()
            .iter()
            .filter_map(|part| content_part(part, &mut function_calls))
            .collect();

        let finish_reason = response.first_finish_reason().cloned();
        let stop_reason = finish_reason.clone().map(unified::UnifiedStopReason::from).unwrap_or_default();

        Self {
            id: response.response_id.clone(),
            model: response.model_version.clone(),
            role: unified::UnifiedRole::Assistant,
            content,
            stop_reason: with_function_calls(stop_reason, function_calls),
            usage: response.usage_metadata.as_ref().map(unified::UnifiedUsage::from),
            provider: Some(unified::UnifiedProvider::Google),
            anthropic: None,
            openai: None,
            google: Some(unified::GoogleResponseExtras {
                model_version: response.model_version.clone(),
                finish_reason: finish_reason.as_ref().map(finish_reason_name),
            }),
            original: serde_json::to_value(&response).ok(),
        }
    }
}

/// Gemini finishes with `STOP` when it calls functions.
pub(crate) fn with_function_calls(
    stop_reason: unified::UnifiedStopReason,
    function_calls: usize,
) -> unified::UnifiedStopReason {
    match stop_reason {
        unified::UnifiedStopReason::EndTurn if function_calls > 0 => unified::UnifiedStopReason::ToolUse,
        other => other,
    }
}

/// Converts one part. `function_calls` counts the calls seen so far, across chunks
/// when streaming.
pub(crate) fn content_part(part: &google::GooglePart, function_calls: &mut usize) -> Option<unified::UnifiedContent> {
    if let Some(call) = &part.function_call {
        let id = function_call_id(*function_calls);
        *function_calls += 1;

        let input = match &call.args {
            Value::Object(args) => args.clone(),
            _ => unified::JsonObject::new(),
        };

        return Some(unified::UnifiedContent::ToolUse(unified::UnifiedToolUse {
            id,
            name: call.name.clone(),
            input: Some(input),
        }));
    }

    if let Some(response) = &part.function_response {
        let content = match response.response.get("content") {
            Some(Value::String(content)) => content.clone(),
            Some(other) => other.to_string(),
            None => response.response.to_string(),
        };

        return Some(unified::UnifiedContent::ToolResult(unified::UnifiedToolResult {
            tool_use_id: response.name.clone(),
            tool_name: Some(response.name.clone()),
            content,
            is_error: Some(false),
        }));
    }

    let text = part.text.clone()?;

    if part.is_thought() {
        return Some(unified::UnifiedContent::Thinking {
            thinking: text,
            signature: part.thought_signature.clone().unwrap_or_default(),
        });
    }

    Some(unified::UnifiedContent::Text { text })
}

pub(crate) fn finish_reason_name(reason: &google::GoogleFinishReason) -> String {
    match reason {
        google::GoogleFinishReason::Stop => "STOP".to_string(),
        google::GoogleFinishReason::MaxTokens => "MAX_TOKENS".to_string(),
        google::GoogleFinishReason::Safety => "SAFETY".to_string(),
        google::GoogleFinishReason::Recitation => "RECITATION".to_string(),
        google::GoogleFinishReason::Other(other) => other.clone(),
    }
}

impl From<google::GoogleFinishReason> for unified::UnifiedStopReason {
    fn from(reason: google::GoogleFinishReason) -> Self {
        match reason {
            google::GoogleFinishReason::Stop => unified::UnifiedStopReason::EndTurn,
            google::GoogleFinishReason::MaxTokens => unified::UnifiedStopReason::MaxTokens,
            google::GoogleFinishReason::Safety | google::GoogleFinishReason::Recitation => {
                unified::UnifiedStopReason::ContentFilter
            }
            google::GoogleFinishReason::Other(_) => unified::UnifiedStopReason::EndTurn,
        }
    }
}

impl From<&google::GoogleUsageMetadata> for unified::UnifiedUsage {
    fn from(metadata: &google::GoogleUsageMetadata) -> Self {
        Self {
            input_tokens: metadata.prompt_token_count,
            output_tokens: metadata.candidates_token_count,
            total_tokens: Some(metadata.total_token_count),
            anthropic: None,
            openai: None,
            google: Some(unified::GoogleUsageExtras {
                traffic_type: metadata.traffic_type.clone(),
                prompt_tokens_details: metadata.prompt_tokens_details.clone(),
                candidates_tokens_details: metadata.candidates_tokens_details.clone(),
                thoughts_token_count: metadata.thoughts_token_count,
            }),
        }
    }
}

//! Conversion of unified responses back into vendor payloads.
//!
//! A response that still carries its verbatim vendor payload is returned as is. Otherwise
//! the payload is rebuilt from the unified fields and the vendor side channels.

use serde::Serialize;
use serde_json::Value;

use super::to_openai::encode_arguments;
use crate::{
    error::{LlmError, LlmResult},
    messages::{anthropic, google, openai, unified},
};

impl unified::UnifiedResponse {
    /// The vendor payload this response represents.
    ///
    /// Returns the retained `_original` unchanged when present. Fails with
    /// [`LlmError::UnknownProvider`] when neither the payload nor a reconstructible
    /// provider tag is available.
    pub fn to_original(&self) -> LlmResult<Value> {
        if let Some(original) = &self.original {
            return Ok(original.clone());
        }

        match self.provider {
            None => Err(LlmError::UnknownProvider(
                "no _original and no _provider specified".to_string(),
            )),
            Some(unified::UnifiedProvider::Anthropic) => to_json(to_anthropic(self)?),
            Some(unified::UnifiedProvider::OpenAi) => to_json(to_openai(self)),
            Some(unified::UnifiedProvider::Google) => to_json(to_google(self)?),
            Some(provider @ unified::UnifiedProvider::Mcp) => Err(LlmError::UnknownProvider(provider.to_string())),
        }
    }
}

fn to_json<T: Serialize>(payload: T) -> LlmResult<Value> {
    serde_json::to_value(payload).map_err(|e| {
        log::error!("Failed to serialize rebuilt vendor payload: {e}");
        LlmError::InternalError(None)
    })
}

fn to_anthropic(response: &unified::UnifiedResponse) -> LlmResult<anthropic::AnthropicResponse> {
    let content = response
        .content
        .iter()
        .map(anthropic::AnthropicContentBlock::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let extras = response.anthropic.clone().unwrap_or_default();

    let stop_reason = match response.stop_reason {
        unified::UnifiedStopReason::EndTurn | unified::UnifiedStopReason::Error => anthropic::AnthropicStopReason::EndTurn,
        unified::UnifiedStopReason::ToolUse => anthropic::AnthropicStopReason::ToolUse,
        unified::UnifiedStopReason::MaxTokens => anthropic::AnthropicStopReason::MaxTokens,
        unified::UnifiedStopReason::StopSequence => anthropic::AnthropicStopReason::StopSequence,
        unified::UnifiedStopReason::ContentFilter => anthropic::AnthropicStopReason::ContentFilter,
    };

    let usage = response
        .usage
        .as_ref()
        .map(|usage| {
            let cache = usage.anthropic.clone().unwrap_or_default();

            anthropic::AnthropicUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                cache_creation_input_tokens: cache.cache_creation_input_tokens,
                cache_read_input_tokens: cache.cache_read_input_tokens,
            }
        })
        .unwrap_or_default();

    Ok(anthropic::AnthropicResponse {
        id: response.id.clone().unwrap_or_default(),
        response_type: extras.message_type.unwrap_or_else(|| "message".to_string()),
        role: anthropic::AnthropicRole::Assistant,
        model: response.model.clone().unwrap_or_default(),
        content,
        stop_reason: Some(stop_reason),
        stop_sequence: extras.stop_sequence,
        usage,
    })
}

fn to_openai(response: &unified::UnifiedResponse) -> openai::OpenAiResponse {
    let extras = response.openai.clone().unwrap_or_default();

    let reasoning_content = response.content.iter().find_map(|block| match block {
        unified::UnifiedContent::Thinking { thinking, .. } => Some(thinking.clone()),
        _ => None,
    });

    let tool_calls: Vec<_> = response
        .tool_uses()
        .enumerate()
        .map(|(index, tool_use)| openai::OpenAiToolCall {
            index: Some(index),
            id: Some(tool_use.id.clone()),
            call_type: Some("function".to_string()),
            function: openai::OpenAiFunctionCall {
                name: Some(tool_use.name.clone()),
                arguments: Some(encode_arguments(tool_use.input.as_ref())),
            },
        })
        .collect();

    let finish_reason = match response.stop_reason {
        unified::UnifiedStopReason::ToolUse => openai::OpenAiFinishReason::ToolCalls,
        unified::UnifiedStopReason::MaxTokens => openai::OpenAiFinishReason::Length,
        unified::UnifiedStopReason::ContentFilter => openai::OpenAiFinishReason::ContentFilter,
        unified::UnifiedStopReason::EndTurn
        | unified::UnifiedStopReason::StopSequence
        | unified::UnifiedStopReason::Error => openai::OpenAiFinishReason::Stop,
    };

    let message = openai::OpenAiResponseMessage {
        role: Some(openai::OpenAiRole::Assistant),
        content: Some(response.text()),
        reasoning_content,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    };

    let usage = response.usage.as_ref().map(|usage| {
        let details = usage.openai.clone().unwrap_or_default();

        openai::OpenAiUsage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: total_tokens(usage),
            prompt_tokens_details: details.prompt_tokens_details,
            completion_tokens_details: details.completion_tokens_details,
        }
    });

    openai::OpenAiResponse {
        id: response.id.clone().unwrap_or_default(),
        object: extras.object.unwrap_or_else(|| "chat.completion".to_string()),
        created: extras.created.unwrap_or_else(now_seconds),
        model: response.model.clone().unwrap_or_default(),
        system_fingerprint: extras.system_fingerprint,
        choices: vec![openai::OpenAiChoice {
            index: 0,
            message: Some(message),
            delta: None,
            finish_reason: Some(finish_reason),
        }],
        usage,
    }
}

fn to_google(response: &unified::UnifiedResponse) -> LlmResult<google::GoogleGenerateResponse> {
    let mut parts = Vec::with_capacity(response.content.len());

    for block in &response.content {
        let part = match block {
            unified::UnifiedContent::Text { text } => google::GooglePart::text(text.clone()),
            unified::UnifiedContent::Thinking { thinking, .. } => {
                log::warn!("Google responses cannot carry thinking content, rendering it as text");
                google::GooglePart::text(format!("[Thinking: {thinking}]"))
            }
            unified::UnifiedContent::ToolUse(tool_use) => google::GooglePart::function_call(
                tool_use.name.clone(),
                Value::Object(tool_use.input.clone().unwrap_or_default()),
            ),
            unified::UnifiedContent::ToolResult(result) => {
                let mut part = google::GooglePart::function_response(
                    result.tool_use_id.clone(),
                    serde_json::json!({ "content": result.content }),
                );
                part.thought_signature = Some(String::new());
                part
            }
            unified::UnifiedContent::Image { .. } => {
                return Err(LlmError::UnsupportedContentType(block.kind().to_string()));
            }
        };

        parts.push(part);
    }

    let finish_reason = match response.stop_reason {
        unified::UnifiedStopReason::MaxTokens => google::GoogleFinishReason::MaxTokens,
        unified::UnifiedStopReason::ContentFilter => google::GoogleFinishReason::Safety,
        unified::UnifiedStopReason::EndTurn
        | unified::UnifiedStopReason::ToolUse
        | unified::UnifiedStopReason::StopSequence
        | unified::UnifiedStopReason::Error => google::GoogleFinishReason::Stop,
    };

    let usage_metadata = response.usage.as_ref().map(|usage| {
        let extras = usage.google.clone().unwrap_or_default();

        google::GoogleUsageMetadata {
            prompt_token_count: usage.input_tokens,
            candidates_token_count: usage.output_tokens,
            total_token_count: total_tokens(usage),
            traffic_type: Some(extras.traffic_type.unwrap_or_else(|| "0".to_string())),
            prompt_tokens_details: Some(extras.prompt_tokens_details.unwrap_or_default()),
            candidates_tokens_details: Some(extras.candidates_tokens_details.unwrap_or_default()),
            thoughts_token_count: Some(extras.thoughts_token_count.unwrap_or_default()),
        }
    });

    let model_version = response
        .google
        .as_ref()
        .and_then(|extras| extras.model_version.clone())
        .or_else(|| response.model.clone())
        .unwrap_or_default();

    Ok(google::GoogleGenerateResponse {
        candidates: vec![google::GoogleCandidate {
            content: Some(google::GoogleContent {
                role: Some(google::GoogleRole::Model),
                parts,
            }),
            finish_reason: Some(finish_reason),
            index: None,
        }],
        usage_metadata,
        model_version: Some(model_version),
        response_id: response.id.clone(),
    })
}

fn total_tokens(usage: &unified::UnifiedUsage) -> u32 {
    usage
        .total_tokens
        .unwrap_or_else(|| usage.input_tokens.saturating_add(usage.output_tokens))
}

fn now_seconds() -> u64 {
    u64::try_from(jiff::Timestamp::now().as_second()).unwrap_or_default()
}

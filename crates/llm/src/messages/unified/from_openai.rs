//! Conversions from OpenAI protocol types to unified types.

use crate::messages::{openai, unified};

impl From<openai::OpenAiResponse> for unified::UnifiedResponse {
    fn from(response: openai::OpenAiResponse) -> Self {
        let mut content = Vec::new();

        if let Some(message) = response.first_message() {
            if let Some(text) = &message.content
                && !text.is_empty()
            {
                content.push(unified::UnifiedContent::text(text.clone()));
            }

            if let Some(reasoning) = &message.reasoning_content
                && !reasoning.is_empty()
            {
                content.push(unified::UnifiedContent::Thinking {
                    thinking: reasoning.clone(),
                    signature: String::new(),
                });
            }

            for call in message.tool_calls.iter().flatten() {
                content.push(unified::UnifiedContent::ToolUse(unified::UnifiedToolUse {
                    id: call.id.clone().unwrap_or_default(),
                    name: call.function.name.clone().unwrap_or_default(),
                    input: Some(parse_arguments(call.function.arguments.as_deref())),
                }));
            }
        }

        let stop_reason = response
            .first_finish_reason()
            .cloned()
            .map(unified::UnifiedStopReason::from)
            .unwrap_or_default();

        Self {
            id: Some(response.id.clone()),
            model: Some(response.model.clone()),
            role: unified::UnifiedRole::Assistant,
            content,
            stop_reason,
            usage: response.usage.as_ref().map(unified::UnifiedUsage::from),
            provider: Some(unified::UnifiedProvider::OpenAi),
            anthropic: None,
            openai: Some(unified::OpenAiResponseExtras {
                object: Some(response.object.clone()),
                created: Some(response.created),
                system_fingerprint: response.system_fingerprint.clone(),
            }),
            google: None,
            original: serde_json::to_value(&response).ok(),
        }
    }
}

/// Parses a JSON-encoded argument string. Anything but a valid JSON object yields `{}`.
fn parse_arguments(arguments: Option<&str>) -> unified::JsonObject {
    let Some(arguments) = arguments.filter(|arguments| !arguments.trim().is_empty()) else {
        return unified::JsonObject::new();
    };

    match serde_json::from_str(arguments) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            log::warn!("Tool call arguments are not a JSON object, using empty arguments: {arguments}");
            unified::JsonObject::new()
        }
    }
}

impl From<openai::OpenAiFinishReason> for unified::UnifiedStopReason {
    fn from(reason: openai::OpenAiFinishReason) -> Self {
        match reason {
            openai::OpenAiFinishReason::Stop => unified::UnifiedStopReason::EndTurn,
            openai::OpenAiFinishReason::ToolCalls => unified::UnifiedStopReason::ToolUse,
            openai::OpenAiFinishReason::Length => unified::UnifiedStopReason::MaxTokens,
            openai::OpenAiFinishReason::ContentFilter => unified::UnifiedStopReason::ContentFilter,
            openai::OpenAiFinishReason::FunctionCall | openai::OpenAiFinishReason::Other(_) => {
                unified::UnifiedStopReason::EndTurn
            }
        }
    }
}

impl From<&openai::OpenAiUsage> for unified::UnifiedUsage {
    fn from(usage: &openai::OpenAiUsage) -> Self {
        let has_details = usage.prompt_tokens_details.is_some() || usage.completion_tokens_details.is_some();

        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: Some(usage.total_tokens),
            anthropic: None,
            openai: has_details.then(|| unified::OpenAiUsageExtras {
                prompt_tokens_details: usage.prompt_tokens_details.clone(),
                completion_tokens_details: usage.completion_tokens_details.clone(),
            }),
            google: None,
        }
    }
}

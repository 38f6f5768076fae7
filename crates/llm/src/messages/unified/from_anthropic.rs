//! Conversions from Anthropic protocol types to unified types.

use crate::messages::{anthropic, unified};

impl From<anthropic::AnthropicResponse> for unified::UnifiedResponse {
    fn from(response: anthropic::AnthropicResponse) -> Self {
        let content = response
            .content
            .iter()
            .filter_map(|block| content_block(block.clone()))
            .collect();

        let stop_reason = response
            .stop_reason
            .clone()
            .map(unified::UnifiedStopReason::from)
            .unwrap_or_default();

        Self {
            id: Some(response.id.clone()),
            model: Some(response.model.clone()),
            role: unified::UnifiedRole::Assistant,
            content,
            stop_reason,
            usage: Some(unified::UnifiedUsage::from(&response.usage)),
            provider: Some(unified::UnifiedProvider::Anthropic),
            anthropic: Some(unified::AnthropicResponseExtras {
                stop_sequence: response.stop_sequence.clone(),
                message_type: Some(response.response_type.clone()),
            }),
            openai: None,
            google: None,
            original: serde_json::to_value(&response).ok(),
        }
    }
}

/// Converts one content block, `None` for block types without a unified counterpart.
pub(crate) fn content_block(block: anthropic::AnthropicContentBlock) -> Option<unified::UnifiedContent> {
    let block = match block {
        anthropic::AnthropicContentBlock::Text { text } => unified::UnifiedContent::Text { text },
        anthropic::AnthropicContentBlock::Thinking { thinking, signature } => {
            unified::UnifiedContent::Thinking { thinking, signature }
        }
        anthropic::AnthropicContentBlock::ToolUse { id, name, input } => {
            let input = match input {
                serde_json::Value::Object(map) => map,
                _ => unified::JsonObject::new(),
            };

            unified::UnifiedContent::ToolUse(unified::UnifiedToolUse {
                id,
                name,
                input: Some(input),
            })
        }
        anthropic::AnthropicContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => unified::UnifiedContent::ToolResult(unified::UnifiedToolResult {
            tool_use_id,
            tool_name: None,
            content,
            is_error,
        }),
        anthropic::AnthropicContentBlock::Unsupported => {
            log::debug!("Skipping unsupported Anthropic content block");
            return None;
        }
    };

    Some(block)
}

impl From<anthropic::AnthropicStopReason> for unified::UnifiedStopReason {
    fn from(reason: anthropic::AnthropicStopReason) -> Self {
        match reason {
            anthropic::AnthropicStopReason::EndTurn => unified::UnifiedStopReason::EndTurn,
            anthropic::AnthropicStopReason::MaxTokens => unified::UnifiedStopReason::MaxTokens,
            anthropic::AnthropicStopReason::StopSequence => unified::UnifiedStopReason::StopSequence,
            anthropic::AnthropicStopReason::ToolUse => unified::UnifiedStopReason::ToolUse,
            anthropic::AnthropicStopReason::ContentFilter => unified::UnifiedStopReason::ContentFilter,
            anthropic::AnthropicStopReason::Other(_) => unified::UnifiedStopReason::EndTurn,
        }
    }
}

impl From<&anthropic::AnthropicUsage> for unified::UnifiedUsage {
    fn from(usage: &anthropic::AnthropicUsage) -> Self {
        let has_cache_counters = usage.cache_creation_input_tokens.is_some() || usage.cache_read_input_tokens.is_some();

        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: Some(usage.input_tokens.saturating_add(usage.output_tokens)),
            anthropic: has_cache_counters.then(|| unified::AnthropicUsageExtras {
                cache_creation_input_tokens: usage.cache_creation_input_tokens,
                cache_read_input_tokens: usage.cache_read_input_tokens,
            }),
            openai: None,
            google: None,
        }
    }
}

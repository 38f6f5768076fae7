//! Conversions from unified types to Anthropic protocol types.

use serde_json::Value;

use crate::{
    error::LlmError,
    messages::{anthropic, unified},
};

/// Anthropic requires `max_tokens`; used when the request leaves it unset.
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 4096;

impl TryFrom<&unified::UnifiedRequest> for anthropic::AnthropicRequest {
    type Error = LlmError;

    fn try_from(req: &unified::UnifiedRequest) -> Result<Self, Self::Error> {
        // System messages join the system prompt in its own field.
        let messages = req
            .messages
            .iter()
            .filter(|message| message.role != unified::UnifiedRole::System)
            .map(anthropic::AnthropicMessage::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            model: req.model.clone(),
            messages,
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: system_prompt(req),
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            stop_sequences: req.stop_sequences.clone(),
            stream: req.stream,
            tools: req
                .tools
                .as_ref()
                .map(|tools| tools.iter().map(anthropic::AnthropicTool::from).collect()),
        })
    }
}

fn system_prompt(req: &unified::UnifiedRequest) -> Option<String> {
    let prompts = req.system_prompts();
    (!prompts.is_empty()).then(|| prompts.join("\n\n"))
}

impl From<unified::UnifiedRole> for anthropic::AnthropicRole {
    fn from(role: unified::UnifiedRole) -> Self {
        match role {
            unified::UnifiedRole::Assistant => anthropic::AnthropicRole::Assistant,
            // Tool results travel in user messages
            unified::UnifiedRole::User | unified::UnifiedRole::Tool | unified::UnifiedRole::System => {
                anthropic::AnthropicRole::User
            }
        }
    }
}

impl TryFrom<&unified::UnifiedMessage> for anthropic::AnthropicMessage {
    type Error = LlmError;

    fn try_from(msg: &unified::UnifiedMessage) -> Result<Self, Self::Error> {
        let content = match &msg.content {
            unified::UnifiedContentContainer::Text(text) => anthropic::AnthropicMessageContent::Text(text.clone()),
            unified::UnifiedContentContainer::Blocks(blocks) => {
                let blocks = blocks
                    .iter()
                    .map(anthropic::AnthropicContentBlock::try_from)
                    .collect::<Result<Vec<_>, _>>()?;

                anthropic::AnthropicMessageContent::Blocks(blocks)
            }
        };

        Ok(Self {
            role: msg.role.into(),
            content,
        })
    }
}

impl TryFrom<&unified::UnifiedContent> for anthropic::AnthropicContentBlock {
    type Error = LlmError;

    fn try_from(block: &unified::UnifiedContent) -> Result<Self, Self::Error> {
        let block = match block {
            unified::UnifiedContent::Text { text } => anthropic::AnthropicContentBlock::Text { text: text.clone() },
            unified::UnifiedContent::Thinking { thinking, signature } => anthropic::AnthropicContentBlock::Thinking {
                thinking: thinking.clone(),
                signature: signature.clone(),
            },
            unified::UnifiedContent::ToolUse(tool_use) => anthropic::AnthropicContentBlock::ToolUse {
                id: tool_use.id.clone(),
                name: tool_use.name.clone(),
                input: Value::Object(tool_use.input.clone().unwrap_or_default()),
            },
            unified::UnifiedContent::ToolResult(result) => anthropic::AnthropicContentBlock::ToolResult {
                tool_use_id: result.tool_use_id.clone(),
                content: result.content.clone(),
                is_error: result.is_error,
            },
            unified::UnifiedContent::Image { .. } => {
                return Err(LlmError::UnsupportedContentType(block.kind().to_string()));
            }
        };

        Ok(block)
    }
}

impl From<&unified::UnifiedTool> for anthropic::AnthropicTool {
    fn from(tool: &unified::UnifiedTool) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: anthropic::AnthropicToolInputSchema {
                schema_type: "object".to_string(),
                properties: tool.parameters.properties.clone(),
                required: tool.parameters.required.clone(),
            },
        }
    }
}

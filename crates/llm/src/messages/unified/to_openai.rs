//! Conversions from unified types to OpenAI protocol types.

use serde_json::Value;

use crate::{
    error::LlmError,
    messages::{openai, unified},
};

impl TryFrom<&unified::UnifiedRequest> for openai::OpenAiRequest {
    type Error = LlmError;

    fn try_from(req: &unified::UnifiedRequest) -> Result<Self, Self::Error> {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);

        let has_system_message = req
            .messages
            .iter()
            .any(|message| message.role == unified::UnifiedRole::System);

        if let Some(system) = &req.system
            && !has_system_message
        {
            messages.push(openai::OpenAiMessage {
                role: openai::OpenAiRole::System,
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        for message in &req.messages {
            messages.extend(openai_messages(message)?);
        }

        Ok(Self {
            model: req.model.clone(),
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            stop: req.stop_sequences.clone(),
            stream: req.stream,
            stream_options: None,
            tools: req
                .tools
                .as_ref()
                .map(|tools| tools.iter().map(openai::OpenAiTool::from).collect()),
        })
    }
}

impl From<unified::UnifiedRole> for openai::OpenAiRole {
    fn from(role: unified::UnifiedRole) -> Self {
        match role {
            unified::UnifiedRole::System => openai::OpenAiRole::System,
            unified::UnifiedRole::User => openai::OpenAiRole::User,
            unified::UnifiedRole::Assistant => openai::OpenAiRole::Assistant,
            unified::UnifiedRole::Tool => openai::OpenAiRole::Tool,
        }
    }
}

/// The OpenAI messages of one unified message.
///
/// Every tool result becomes its own `tool` message, whatever the role of the message
/// carrying it. Text sent next to tool results follows them as a regular message.
fn openai_messages(msg: &unified::UnifiedMessage) -> Result<Vec<openai::OpenAiMessage>, LlmError> {
    // Images have no encoding here. Thinking blocks are dropped silently.
    if let Some(image) = msg
        .content
        .blocks()
        .iter()
        .find(|block| matches!(block, unified::UnifiedContent::Image { .. }))
    {
        return Err(LlmError::UnsupportedContentType(image.kind().to_string()));
    }

    let text = msg.content.joined_text();

    if msg.role == unified::UnifiedRole::Assistant {
        let tool_calls: Vec<_> = msg
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

        if !tool_calls.is_empty() {
            return Ok(vec![openai::OpenAiMessage {
                role: openai::OpenAiRole::Assistant,
                content: (!text.is_empty()).then_some(text),
                tool_calls: Some(tool_calls),
                tool_call_id: None,
            }]);
        }
    }

    let mut messages: Vec<_> = msg
        .content
        .blocks()
        .iter()
        .filter_map(|block| match block {
            unified::UnifiedContent::ToolResult(result) => Some(openai::OpenAiMessage {
                role: openai::OpenAiRole::Tool,
                content: Some(result.content.clone()),
                tool_calls: None,
                tool_call_id: Some(result.tool_use_id.clone()),
            }),
            _ => None,
        })
        .collect();

    if messages.is_empty() || !text.is_empty() {
        let role = match msg.role {
            unified::UnifiedRole::Tool => openai::OpenAiRole::User,
            role => role.into(),
        };

        messages.push(openai::OpenAiMessage {
            role,
            content: Some(text),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    Ok(messages)
}

/// Tool arguments as the JSON string OpenAI expects.
pub(crate) fn encode_arguments(input: Option<&unified::JsonObject>) -> String {
    match input {
        Some(input) => Value::Object(input.clone()).to_string(),
        None => "{}".to_string(),
    }
}

impl From<&unified::UnifiedTool> for openai::OpenAiTool {
    fn from(tool: &unified::UnifiedTool) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: openai::OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.to_value(),
            },
        }
    }
}

//! Builders for requests and conversation messages.

use crate::{
    error::{LlmError, LlmResult},
    messages::unified::{
        UnifiedContent, UnifiedMessage, UnifiedProvider, UnifiedRequest, UnifiedResponse, UnifiedRole, UnifiedTool,
    },
    tool::ToolResult,
};

/// Step-by-step construction of a [`UnifiedRequest`].
#[derive(Debug, Clone, Default)]
pub struct UnifiedRequestBuilder {
    request: UnifiedRequest,
}

impl UnifiedRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.request.model = model.into();
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.request.system = Some(system.into());
        self
    }

    pub fn message(mut self, message: UnifiedMessage) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = UnifiedMessage>) -> Self {
        self.request.messages.extend(messages);
        self
    }

    pub fn user(self, text: impl Into<String>) -> Self {
        self.message(UnifiedMessage::user(text))
    }

    pub fn assistant(self, text: impl Into<String>) -> Self {
        self.message(UnifiedMessage::assistant(text))
    }

    pub fn tools(mut self, tools: Vec<UnifiedTool>) -> Self {
        self.request.tools = Some(tools);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.request.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.request.top_k = Some(top_k);
        self
    }

    pub fn stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.request.stop_sequences = Some(stop_sequences);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.request.stream = Some(stream);
        self
    }

    /// Routes the request to a specific provider.
    pub fn provider(mut self, provider: UnifiedProvider) -> Self {
        self.request.provider = Some(provider);
        self
    }

    pub fn build(self) -> LlmResult<UnifiedRequest> {
        if self.request.model.trim().is_empty() {
            return Err(LlmError::InvalidRequest("Model is required".to_string()));
        }

        if self.request.messages.is_empty() {
            return Err(LlmError::InvalidRequest("At least one message is required".to_string()));
        }

        Ok(self.request)
    }
}

impl UnifiedRequest {
    pub fn builder() -> UnifiedRequestBuilder {
        UnifiedRequestBuilder::new()
    }

    /// The `system` field followed by the text of every system-role message, in order.
    ///
    /// Empty prompts are skipped.
    pub fn system_prompts(&self) -> Vec<String> {
        let messages = self
            .messages
            .iter()
            .filter(|message| message.role == UnifiedRole::System)
            .map(|message| message.content.joined_text());

        self.system
            .iter()
            .cloned()
            .chain(messages)
            .filter(|prompt| !prompt.trim().is_empty())
            .collect()
    }
}

/// The assistant turn of `response`, to be sent back in the next request.
///
/// Keeps text and tool uses. Reasoning traces are not replayed.
pub fn assistant_message(response: &UnifiedResponse) -> UnifiedMessage {
    let blocks = response
        .content
        .iter()
        .filter(|block| match block {
            UnifiedContent::Text { text } => !text.is_empty(),
            UnifiedContent::ToolUse(_) => true,
            UnifiedContent::Thinking { .. } | UnifiedContent::ToolResult(_) | UnifiedContent::Image { .. } => false,
        })
        .cloned()
        .collect();

    UnifiedMessage::blocks(UnifiedRole::Assistant, blocks)
}

pub fn user_message(text: impl Into<String>) -> UnifiedMessage {
    UnifiedMessage::user(text)
}

pub fn tool_result_content(result: &ToolResult) -> UnifiedContent {
    result.to_content()
}

/// One user message carrying all `results` as `tool_result` blocks, in order.
pub fn tool_result_message(results: &[ToolResult]) -> UnifiedMessage {
    UnifiedMessage::blocks(UnifiedRole::User, results.iter().map(tool_result_content).collect())
}

/// Appends the assistant turn of `response` and the matching tool results.
pub fn append_tool_results(messages: &mut Vec<UnifiedMessage>, response: &UnifiedResponse, results: &[ToolResult]) {
    messages.push(assistant_message(response));
    messages.push(tool_result_message(results));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::messages::unified::UnifiedToolUse;

    #[test]
    fn system_prompts_collect_field_and_messages() {
        let request = UnifiedRequest::builder()
            .model("gpt-4o")
            .system("Be brief.")
            .message(UnifiedMessage::system("Always answer in French."))
            .user("hi")
            .message(UnifiedMessage::system(""))
            .build()
            .unwrap();

        assert_eq!(request.system_prompts(), ["Be brief.", "Always answer in French."]);
    }

    #[test]
    fn builder_requires_model_and_messages() {
        let error = UnifiedRequest::builder().user("hi").build().unwrap_err();
        assert_eq!(error.to_string(), "Invalid request: Model is required");

        let error = UnifiedRequest::builder().model("gpt-4o").build().unwrap_err();
        assert_eq!(error.to_string(), "Invalid request: At least one message is required");
    }

    #[test]
    fn builder_sets_every_field() {
        let request = UnifiedRequest::builder()
            .model("gemini-1.5-pro")
            .system("Be brief.")
            .user("Hello")
            .assistant("Hi!")
            .message(user_message("Weather?"))
            .max_tokens(256)
            .temperature(0.5)
            .top_p(0.25)
            .top_k(40)
            .stop_sequences(vec!["END".to_string()])
            .stream(false)
            .provider(UnifiedProvider::Google)
            .build()
            .unwrap();

        insta::assert_json_snapshot!(request, @r#"
        {
          "model": "gemini-1.5-pro",
          "system": "Be brief.",
          "messages": [
            {
              "role": "user",
              "content": "Hello"
            },
            {
              "role": "assistant",
              "content": "Hi!"
            },
            {
              "role": "user",
              "content": "Weather?"
            }
          ],
          "maxTokens": 256,
          "temperature": 0.5,
          "topP": 0.25,
          "topK": 40,
          "stopSequences": [
            "END"
          ],
          "stream": false,
          "_provider": "google"
        }
        "#);
    }

    #[test]
    fn assistant_message_drops_reasoning() {
        let response = UnifiedResponse {
            content: vec![
                UnifiedContent::Thinking {
                    thinking: "hmm".to_string(),
                    signature: "sig".to_string(),
                },
                UnifiedContent::text(""),
                UnifiedContent::ToolUse(UnifiedToolUse {
                    id: "call_1".to_string(),
                    name: "add".to_string(),
                    input: json!({"a": 1}).as_object().cloned(),
                }),
            ],
            ..UnifiedResponse::empty()
        };

        let message = assistant_message(&response);

        assert_eq!(message.role, UnifiedRole::Assistant);
        assert_eq!(message.content.blocks().len(), 1);
        assert_eq!(message.tool_uses().count(), 1);
    }
}

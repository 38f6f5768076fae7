//! Folding of vendor streaming events into a single [`UnifiedResponse`].
//!
//! Each vendor streams a different event vocabulary. Anthropic addresses content blocks by
//! index and sends typed deltas, OpenAI sends `choices[0].delta` fragments with tool calls
//! keyed by their own index, and Gemini sends full response objects holding only the new
//! parts. [`StreamAggregator`] is a left fold over all three: events are applied one at a
//! time in arrival order and nothing is ever removed until [`StreamAggregator::finish`].

use std::collections::HashMap;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LlmError, LlmResult},
    messages::{
        anthropic::{AnthropicBlockDelta, AnthropicContentBlock, AnthropicStreamEvent},
        google::GoogleGenerateResponse,
        openai::{OpenAiChunk, OpenAiToolCall},
        unified::{
            AnthropicResponseExtras, GoogleResponseExtras, JsonObject, OpenAiResponseExtras, UnifiedContent,
            UnifiedProvider, UnifiedResponse, UnifiedStopReason, UnifiedToolUse, UnifiedUsage, from_google,
        },
    },
};

/// One event of a vendor stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Anthropic(AnthropicStreamEvent),
    OpenAi(OpenAiChunk),
    Google(GoogleGenerateResponse),
}

impl StreamEvent {
    pub fn provider(&self) -> UnifiedProvider {
        match self {
            StreamEvent::Anthropic(_) => UnifiedProvider::Anthropic,
            StreamEvent::OpenAi(_) => UnifiedProvider::OpenAi,
            StreamEvent::Google(_) => UnifiedProvider::Google,
        }
    }

    /// Answer text carried by this event, without reasoning.
    pub fn text_delta(&self) -> Option<String> {
        let text = match self {
            StreamEvent::Anthropic(AnthropicStreamEvent::ContentBlockDelta {
                delta: AnthropicBlockDelta::TextDelta { text },
                ..
            }) => text.clone(),
            StreamEvent::Anthropic(AnthropicStreamEvent::ContentBlockStart {
                content_block: AnthropicContentBlock::Text { text, .. },
                ..
            }) => text.clone(),
            StreamEvent::Anthropic(_) => return None,
            StreamEvent::OpenAi(chunk) => chunk.first_message()?.content.clone()?,
            StreamEvent::Google(chunk) => chunk
                .first_parts()
                .iter()
                .filter(|part| part.thought != Some(true))
                .filter_map(|part| part.text.as_deref())
                .collect(),
        };

        (!text.is_empty()).then_some(text)
    }
}

/// Consumes `stream` and folds it into a response.
///
/// Stops reading as soon as `cancel` fires and returns [`LlmError::Cancelled`]. The stream
/// is dropped on return, which releases the underlying connection.
pub async fn aggregate<S>(stream: S, cancel: CancellationToken) -> LlmResult<UnifiedResponse>
where
    S: Stream<Item = LlmResult<StreamEvent>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut aggregator = StreamAggregator::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Stream aggregation cancelled after {} event(s)", aggregator.events);
                return Err(LlmError::Cancelled);
            }
            next = stream.next() => next,
        };

        match next {
            Some(event) => aggregator.push(event?),
            None => break,
        }
    }

    Ok(aggregator.finish())
}

/// How far past the known blocks a new Anthropic block index may point.
const MAX_BLOCK_INDEX_GAP: usize = 64;

/// A content block under construction.
#[derive(Debug)]
enum Slot {
    Text(String),
    Thinking {
        thinking: String,
        signature: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Input declared when the block started, used if no argument fragments follow.
        start_input: JsonObject,
        /// Concatenated argument fragments.
        arguments: String,
    },
}

/// Incremental state of a stream fold.
#[derive(Debug)]
pub struct StreamAggregator {
    response: UnifiedResponse,
    /// Content blocks addressed by position. Anthropic may leave holes for unknown block types.
    slots: Vec<Option<Slot>>,
    /// OpenAI tool call index to slot position.
    openai_tool_slots: HashMap<usize, usize>,
    /// Gemini function calls seen so far.
    google_function_calls: usize,
    events: usize,
}

impl Default for StreamAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self {
            response: UnifiedResponse::empty(),
            slots: Vec::new(),
            openai_tool_slots: HashMap::new(),
            google_function_calls: 0,
            events: 0,
        }
    }

    /// Applies one event.
    pub fn push(&mut self, event: StreamEvent) {
        self.events += 1;

        match event {
            StreamEvent::Anthropic(event) => self.push_anthropic(event),
            StreamEvent::OpenAi(chunk) => self.push_openai(chunk),
            StreamEvent::Google(chunk) => self.push_google(chunk),
        }
    }

    /// Completes the fold.
    ///
    /// Tool arguments are parsed, and empty text and thinking blocks are dropped.
    pub fn finish(self) -> UnifiedResponse {
        let mut response = self.response;

        response.content = self
            .slots
            .into_iter()
            .flatten()
            .filter_map(|slot| match slot {
                Slot::Text(text) if text.is_empty() => None,
                Slot::Text(text) => Some(UnifiedContent::Text { text }),
                Slot::Thinking { thinking, .. } if thinking.is_empty() => None,
                Slot::Thinking { thinking, signature } => Some(UnifiedContent::Thinking { thinking, signature }),
                Slot::ToolUse {
                    id,
                    name,
                    start_input,
                    arguments,
                } => {
                    let input = parse_arguments(&name, start_input, &arguments);
                    Some(UnifiedContent::ToolUse(UnifiedToolUse { id, name, input }))
                }
            })
            .collect();

        log::debug!(
            "Aggregated {} stream event(s) into {} content block(s), stop reason {}",
            self.events,
            response.content.len(),
            response.stop_reason
        );

        response
    }

    fn push_anthropic(&mut self, event: AnthropicStreamEvent) {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.response.provider = Some(UnifiedProvider::Anthropic);
                self.response.id = Some(message.id);
                self.response.model = Some(message.model);
                self.response.usage = Some(UnifiedUsage::from(&message.usage));
                self.response.anthropic = Some(AnthropicResponseExtras {
                    stop_sequence: None,
                    message_type: Some(message.response_type),
                });
            }
            AnthropicStreamEvent::ContentBlockStart { index, content_block } => {
                let slot = match content_block {
                    AnthropicContentBlock::Text { text } => Slot::Text(text),
                    AnthropicContentBlock::Thinking { thinking, signature } => Slot::Thinking { thinking, signature },
                    AnthropicContentBlock::ToolUse { id, name, input } => Slot::ToolUse {
                        id,
                        name,
                        start_input: match input {
                            serde_json::Value::Object(input) => input,
                            _ => JsonObject::new(),
                        },
                        arguments: String::new(),
                    },
                    AnthropicContentBlock::ToolResult { .. } | AnthropicContentBlock::Unsupported => {
                        log::debug!("Skipping unsupported content block at index {index}");
                        return;
                    }
                };

                let Some(len) = index
                    .checked_add(1)
                    .filter(|len| *len <= self.slots.len().saturating_add(MAX_BLOCK_INDEX_GAP))
                else {
                    log::warn!("Skipping content block with out of range index {index}");
                    return;
                };

                if self.slots.len() < len {
                    self.slots.resize_with(len, || None);
                }

                self.slots[index] = Some(slot);
            }
            AnthropicStreamEvent::ContentBlockDelta { index, delta } => {
                let Some(Some(slot)) = self.slots.get_mut(index) else {
                    log::debug!("Ignoring delta for unknown content block {index}");
                    return;
                };

                match (slot, delta) {
                    (Slot::Text(text), AnthropicBlockDelta::TextDelta { text: fragment }) => text.push_str(&fragment),
                    (Slot::Thinking { thinking, .. }, AnthropicBlockDelta::ThinkingDelta { thinking: fragment }) => {
                        thinking.push_str(&fragment)
                    }
                    (Slot::Thinking { signature, .. }, AnthropicBlockDelta::SignatureDelta { signature: fragment }) => {
                        signature.push_str(&fragment)
                    }
                    (Slot::ToolUse { arguments, .. }, AnthropicBlockDelta::InputJsonDelta { partial_json }) => {
                        arguments.push_str(&partial_json)
                    }
                    (_, delta) => log::debug!("Ignoring mismatched delta for content block {index}: {delta:?}"),
                }
            }
            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if let Some(stop_reason) = delta.stop_reason {
                    self.response.stop_reason = stop_reason.into();
                }

                if delta.stop_sequence.is_some() {
                    self.response.anthropic.get_or_insert_with(Default::default).stop_sequence = delta.stop_sequence;
                }

                if let Some(usage) = usage {
                    let current = self.response.usage.get_or_insert_with(UnifiedUsage::default);

                    if let Some(input_tokens) = usage.input_tokens {
                        current.input_tokens = input_tokens;
                    }

                    current.output_tokens = usage.output_tokens;
                    current.total_tokens = Some(current.input_tokens.saturating_add(usage.output_tokens));
                }
            }
            AnthropicStreamEvent::Error { error } => {
                log::warn!("Anthropic stream reported an error ({}): {}", error.error_type, error.message);
                self.response.stop_reason = UnifiedStopReason::Error;
            }
            AnthropicStreamEvent::ContentBlockStop { .. }
            | AnthropicStreamEvent::MessageStop
            | AnthropicStreamEvent::Ping => {}
        }
    }

    fn push_openai(&mut self, chunk: OpenAiChunk) {
        self.response.provider = Some(UnifiedProvider::OpenAi);
        self.response.openai = Some(OpenAiResponseExtras {
            object: Some(chunk.object.clone()),
            created: Some(chunk.created),
            system_fingerprint: chunk.system_fingerprint.clone(),
        });

        if self.response.id.is_none() {
            self.response.id = Some(chunk.id.clone());
        }

        if self.response.model.is_none() {
            self.response.model = Some(chunk.model.clone());
        }

        if let Some(usage) = &chunk.usage {
            self.response.usage = Some(UnifiedUsage::from(usage));
        }

        if let Some(reason) = chunk.first_finish_reason() {
            self.response.stop_reason = reason.clone().into();
        }

        let Some(delta) = chunk.first_message() else {
            return;
        };

        if let Some(content) = &delta.content
            && !content.is_empty()
        {
            self.append_text(content);
        }

        if let Some(reasoning) = &delta.reasoning_content
            && !reasoning.is_empty()
        {
            self.append_thinking(reasoning);
        }

        for call in delta.tool_calls.iter().flatten() {
            self.push_openai_tool_call(call);
        }
    }

    fn push_openai_tool_call(&mut self, call: &OpenAiToolCall) {
        // Fragments without an index start a call of their own.
        let key = call.index.unwrap_or(self.openai_tool_slots.len());

        let position = match self.openai_tool_slots.get(&key) {
            Some(position) => *position,
            None => {
                self.slots.push(Some(Slot::ToolUse {
                    id: call.id.clone().unwrap_or_default(),
                    name: call.function.name.clone().unwrap_or_default(),
                    start_input: JsonObject::new(),
                    arguments: String::new(),
                }));

                let position = self.slots.len() - 1;
                self.openai_tool_slots.insert(key, position);
                position
            }
        };

        if let Some(Some(Slot::ToolUse {
            id, name, arguments, ..
        })) = self.slots.get_mut(position)
        {
            if id.is_empty()
                && let Some(call_id) = &call.id
            {
                id.clone_from(call_id);
            }

            if name.is_empty()
                && let Some(call_name) = &call.function.name
            {
                name.clone_from(call_name);
            }

            if let Some(fragment) = &call.function.arguments {
                arguments.push_str(fragment);
            }
        }
    }

    fn push_google(&mut self, chunk: GoogleGenerateResponse) {
        self.response.provider = Some(UnifiedProvider::Google);

        if self.response.model.is_none() {
            self.response.model = chunk.model_version.clone();
        }

        if self.response.id.is_none() {
            self.response.id = chunk.response_id.clone();
        }

        if let Some(usage) = &chunk.usage_metadata {
            self.response.usage = Some(UnifiedUsage::from(usage));
        }

        let extras = self.response.google.get_or_insert_with(GoogleResponseExtras::default);

        if chunk.model_version.is_some() {
            extras.model_version = chunk.model_version.clone();
        }

        if let Some(reason) = chunk.first_finish_reason() {
            extras.finish_reason = Some(from_google::finish_reason_name(reason));
            self.response.stop_reason = reason.clone().into();
        }

        for part in chunk.first_parts() {
            match from_google::content_part(part, &mut self.google_function_calls) {
                Some(UnifiedContent::Text { text }) => self.append_text(&text),
                Some(UnifiedContent::Thinking { thinking, .. }) => self.append_thinking(&thinking),
                Some(UnifiedContent::ToolUse(tool_use)) => self.slots.push(Some(Slot::ToolUse {
                    id: tool_use.id,
                    name: tool_use.name,
                    start_input: tool_use.input.unwrap_or_default(),
                    arguments: String::new(),
                })),
                Some(other) => log::debug!("Ignoring streamed {} part", other.kind()),
                None => {}
            }
        }

        if chunk.first_finish_reason().is_some() {
            self.response.stop_reason =
                from_google::with_function_calls(self.response.stop_reason, self.google_function_calls);
        }
    }

    fn append_text(&mut self, fragment: &str) {
        if let Some(Some(Slot::Text(text))) = self.slots.last_mut() {
            text.push_str(fragment);
        } else {
            self.slots.push(Some(Slot::Text(fragment.to_string())));
        }
    }

    fn append_thinking(&mut self, fragment: &str) {
        if let Some(Some(Slot::Thinking { thinking, .. })) = self.slots.last_mut() {
            thinking.push_str(fragment);
        } else {
            self.slots.push(Some(Slot::Thinking {
                thinking: fragment.to_string(),
                signature: String::new(),
            }));
        }
    }
}

/// Parses the concatenated argument fragments of a tool call.
///
/// A buffer missing its opening brace gets one. `None` means the arguments were
/// not a valid JSON object.
fn parse_arguments(name: &str, start_input: JsonObject, arguments: &str) -> Option<JsonObject> {
    let trimmed = arguments.trim();

    if trimmed.is_empty() {
        return Some(start_input);
    }

    let parsed = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed)
    } else {
        serde_json::from_str(&format!("{{{trimmed}"))
    };

    match parsed {
        Ok(serde_json::Value::Object(input)) => Some(input),
        Ok(other) => {
            log::warn!("Arguments of tool call '{name}' are not a JSON object: {other}");
            None
        }
        Err(e) => {
            log::warn!("Failed to parse arguments of tool call '{name}': {e}");
            None
        }
    }
}

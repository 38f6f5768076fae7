use std::time::{Duration, Instant};

use super::{ToolContext, ToolExecutor, ToolResult};
use crate::{
    error::{LlmError, LlmResult},
    messages::unified::{UnifiedRequest, UnifiedResponse, UnifiedStopReason, UnifiedTool, UnifiedToolUse},
    provider::Provider,
    request,
};

/// Replacement system prompt and tool catalog for the next round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Refresh {
    pub system: Option<String>,
    pub tools: Option<Vec<UnifiedTool>>,
}

type RefreshHook<'a> = Box<dyn Fn(&UnifiedRequest) -> Option<Refresh> + Send + Sync + 'a>;
type ToolCallHook<'a> = Box<dyn Fn(&UnifiedToolUse) + Send + Sync + 'a>;
type ToolResultHook<'a> = Box<dyn Fn(&ToolResult, Duration) + Send + Sync + 'a>;

/// Drives chat rounds until the model stops asking for tools.
///
/// Every round sends the request, runs the requested tools concurrently and appends the
/// assistant turn and the tool results to the conversation. Rounds are strictly sequential.
pub struct ToolLoop<'a> {
    provider: &'a dyn Provider,
    executor: &'a ToolExecutor,
    max_iterations: u32,
    on_refresh: Option<RefreshHook<'a>>,
    on_tool_call: Option<ToolCallHook<'a>>,
    on_tool_result: Option<ToolResultHook<'a>>,
}

impl<'a> ToolLoop<'a> {
    pub fn new(provider: &'a dyn Provider, executor: &'a ToolExecutor) -> Self {
        Self {
            provider,
            executor,
            max_iterations: config::DEFAULT_MAX_ITERATIONS,
            on_refresh: None,
            on_tool_call: None,
            on_tool_result: None,
        }
    }

    /// Bound on chat rounds. Reaching it fails the run with [`LlmError::ToolLoopExceeded`].
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Called after each tool round with the next request. A returned [`Refresh`]
    /// replaces the system prompt or the tool catalog.
    pub fn on_refresh(mut self, hook: impl Fn(&UnifiedRequest) -> Option<Refresh> + Send + Sync + 'a) -> Self {
        self.on_refresh = Some(Box::new(hook));
        self
    }

    /// Called right before a tool runs.
    pub fn on_tool_call(mut self, hook: impl Fn(&UnifiedToolUse) + Send + Sync + 'a) -> Self {
        self.on_tool_call = Some(Box::new(hook));
        self
    }

    /// Called with each result and the time its tool took.
    pub fn on_tool_result(mut self, hook: impl Fn(&ToolResult, Duration) + Send + Sync + 'a) -> Self {
        self.on_tool_result = Some(Box::new(hook));
        self
    }

    pub async fn run(&self, mut request: UnifiedRequest, ctx: &ToolContext) -> LlmResult<UnifiedResponse> {
        let mut iteration = 0;

        loop {
            if iteration >= self.max_iterations {
                log::warn!("Tool loop stopped after {iteration} iteration(s)");
                return Err(LlmError::ToolLoopExceeded(self.max_iterations));
            }

            log::debug!(
                "Tool loop iteration {iteration} on {} with {} message(s)",
                self.provider.name(),
                request.messages.len()
            );

            let response = self.provider.chat(&request).await?;
            iteration += 1;

            let tool_uses = response.tool_uses().cloned().collect::<Vec<_>>();

            if response.stop_reason != UnifiedStopReason::ToolUse || tool_uses.is_empty() {
                log::debug!(
                    "Tool loop finished after {iteration} iteration(s) with stop reason {}",
                    response.stop_reason
                );

                return Ok(response);
            }

            log::debug!("Executing {} tool call(s)", tool_uses.len());

            let results = self.execute_round(&tool_uses, ctx).await;
            request::append_tool_results(&mut request.messages, &response, &results);

            if let Some(refresh) = self.on_refresh.as_ref().and_then(|hook| hook(&request)) {
                if let Some(system) = refresh.system {
                    request.system = Some(system);
                }

                if let Some(tools) = refresh.tools {
                    request.tools = Some(tools);
                }
            }
        }
    }

    async fn execute_round(&self, tool_uses: &[UnifiedToolUse], ctx: &ToolContext) -> Vec<ToolResult> {
        let calls = tool_uses.iter().map(|tool_use| async move {
            if let Some(hook) = &self.on_tool_call {
                hook(tool_use);
            }

            let started = Instant::now();
            let result = self.executor.execute(tool_use, ctx).await;

            if let Some(hook) = &self.on_tool_result {
                hook(&result, started.elapsed());
            }

            result
        });

        futures::future::join_all(calls).await
    }
}

//! Entry point dispatching unified requests to the registered adapters.

use std::sync::Arc;

use config::{LlmConfig, LlmProviderConfig, ProviderType};
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LlmError, LlmResult},
    messages::unified::{UnifiedProvider, UnifiedRequest, UnifiedResponse},
    provider::{AnthropicProvider, EventStream, GoogleProvider, OpenAiProvider, Provider},
    stream,
    tool::{ToolContext, ToolExecutor, ToolLoop},
};

/// One adapter per provider, plus the choice of a default.
pub struct LlmService {
    adapters: IndexMap<UnifiedProvider, Arc<dyn Provider>>,
    default: Option<UnifiedProvider>,
    max_iterations: u32,
}

impl Default for LlmService {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmService {
    pub fn new() -> Self {
        Self {
            adapters: IndexMap::new(),
            default: None,
            max_iterations: config::DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Builds the HTTP adapters of every configured vendor.
    ///
    /// JSON-RPC tool endpoints live in their own crate and are registered separately.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        log::debug!("Initializing LLM service with {} provider(s)", config.providers.len());

        let mut service = Self::new();

        for (name, provider_config) in &config.providers {
            log::debug!("Initializing provider: {name}");

            let adapter: Arc<dyn Provider> = match provider_config.clone() {
                LlmProviderConfig::Anthropic(api_config) => Arc::new(AnthropicProvider::new(name.clone(), api_config)?),
                LlmProviderConfig::Openai(api_config) => Arc::new(OpenAiProvider::new(name.clone(), api_config)?),
                LlmProviderConfig::Google(api_config) => Arc::new(GoogleProvider::new(name.clone(), api_config)?),
                LlmProviderConfig::Mcp(_) => {
                    log::debug!("Skipping provider '{name}', MCP endpoints are registered by the caller");
                    continue;
                }
            };

            service.register(adapter);
        }

        if let Some((name, provider_config)) = config.default_provider() {
            log::debug!("Default provider is '{name}'");
            service.default = Some(unified_provider(provider_config.provider_type()));
        }

        Ok(service)
    }

    /// Adds an adapter, replacing any adapter of the same provider.
    pub fn register(&mut self, adapter: Arc<dyn Provider>) -> &mut Self {
        let provider = adapter.provider();

        if let Some(previous) = self.adapters.insert(provider, adapter) {
            log::warn!("Adapter '{}' for {provider} replaced", previous.name());
        }

        self
    }

    /// Provider used for requests without a provider hint.
    pub fn set_default(&mut self, provider: UnifiedProvider) -> &mut Self {
        self.default = Some(provider);
        self
    }

    /// Bound on rounds for [`LlmService::chat_with_tools`].
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// The adapter for `provider`, if it is registered and able to send requests.
    pub fn adapter(&self, provider: UnifiedProvider) -> LlmResult<Arc<dyn Provider>> {
        let adapter = self.adapters.get(&provider).ok_or(LlmError::NoAdapter(provider))?;

        if !adapter.is_available() {
            return Err(LlmError::ProviderNotAvailable(provider));
        }

        Ok(Arc::clone(adapter))
    }

    /// Registered providers whose adapters can send requests, in registration order.
    pub fn available_providers(&self) -> Vec<UnifiedProvider> {
        self.adapters
            .iter()
            .filter(|(_, adapter)| adapter.is_available())
            .map(|(provider, _)| *provider)
            .collect()
    }

    pub async fn chat(&self, request: &UnifiedRequest) -> LlmResult<UnifiedResponse> {
        let adapter = self.select(request)?;
        log::debug!("Sending chat request for model '{}' to {}", request.model, adapter.name());

        adapter.chat(request).await
    }

    /// Runs the tool loop on the selected adapter.
    ///
    /// A request without a tool catalog gets the executor's catalog.
    pub async fn chat_with_tools(
        &self,
        mut request: UnifiedRequest,
        executor: &ToolExecutor,
        ctx: &ToolContext,
    ) -> LlmResult<UnifiedResponse> {
        let adapter = self.select(&request)?;

        if request.tools.is_none() && !executor.registry().is_empty() {
            request.tools = Some(executor.registry().catalog());
        }

        ToolLoop::new(adapter.as_ref(), executor)
            .max_iterations(self.max_iterations)
            .run(request, ctx)
            .await
    }

    /// Streams the response and folds it into one [`UnifiedResponse`].
    pub async fn stream(&self, request: &UnifiedRequest, cancel: CancellationToken) -> LlmResult<UnifiedResponse> {
        let events = self.stream_events(request, cancel.clone()).await?;

        stream::aggregate(events, cancel).await
    }

    /// The raw vendor events of a streamed response.
    pub async fn stream_events(&self, request: &UnifiedRequest, cancel: CancellationToken) -> LlmResult<EventStream> {
        let adapter = self.select(request)?;
        log::debug!("Streaming request for model '{}' from {}", request.model, adapter.name());

        adapter.stream(request, cancel).await
    }

    /// The request hint first, then the default, then the first available adapter.
    fn select(&self, request: &UnifiedRequest) -> LlmResult<Arc<dyn Provider>> {
        if let Some(provider) = request.provider.or(self.default) {
            return self.adapter(provider);
        }

        match self.available_providers().first() {
            Some(provider) => self.adapter(*provider),
            None => Err(LlmError::UnknownProvider(
                "no provider requested and none available".to_string(),
            )),
        }
    }
}

fn unified_provider(provider_type: ProviderType) -> UnifiedProvider {
    match provider_type {
        ProviderType::Anthropic => UnifiedProvider::Anthropic,
        ProviderType::Openai => UnifiedProvider::OpenAi,
        ProviderType::Google => UnifiedProvider::Google,
        ProviderType::Mcp => UnifiedProvider::Mcp,
    }
}

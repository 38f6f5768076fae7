//! LLM provider configuration structures.

use std::fmt;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

/// Provider configurations, keyed by a user-chosen name.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Name of the provider used when a request carries no provider hint.
    pub default_provider: Option<String>,

    /// Configured providers, in declaration order.
    pub providers: IndexMap<String, LlmProviderConfig>,
}

impl LlmConfig {
    /// Whether any provider is configured.
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// The configuration named by `default_provider`, if any.
    pub fn default_provider(&self) -> Option<(&str, &LlmProviderConfig)> {
        let name = self.default_provider.as_deref()?;

        self.providers
            .get_key_value(name)
            .map(|(name, config)| (name.as_str(), config))
    }
}

/// Provider type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    Anthropic,
    Openai,
    Google,
    Mcp,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Anthropic => f.write_str("anthropic"),
            ProviderType::Openai => f.write_str("openai"),
            ProviderType::Google => f.write_str("google"),
            ProviderType::Mcp => f.write_str("mcp"),
        }
    }
}

/// Configuration of an HTTP vendor API.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Custom base URL for the provider API.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Configuration of a JSON-RPC tool endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpProviderConfig {
    /// Endpoint receiving `tools/call` requests.
    pub url: String,
}

/// Complete LLM provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum LlmProviderConfig {
    Anthropic(ApiProviderConfig),
    Openai(ApiProviderConfig),
    Google(ApiProviderConfig),
    Mcp(McpProviderConfig),
}

impl LlmProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Anthropic(_) => ProviderType::Anthropic,
            Self::Openai(_) => ProviderType::Openai,
            Self::Google(_) => ProviderType::Google,
            Self::Mcp(_) => ProviderType::Mcp,
        }
    }

    /// The API key, for HTTP vendor providers.
    pub fn api_key(&self) -> Option<&SecretString> {
        match self {
            Self::Anthropic(config) | Self::Openai(config) | Self::Google(config) => config.api_key.as_ref(),
            Self::Mcp(_) => None,
        }
    }

    /// The base URL, or the endpoint for MCP providers.
    pub fn base_url(&self) -> Option<&str> {
        match self {
            Self::Anthropic(config) | Self::Openai(config) | Self::Google(config) => config.base_url.as_deref(),
            Self::Mcp(config) => Some(&config.url),
        }
    }
}

//! Configuration for the unified LLM layer.
//!
//! Configuration is read from TOML. Every string value may reference environment
//! variables with `{{ env.NAME }}`, which are expanded before deserialization.

mod error;
mod llm;
mod loader;

use std::path::Path;

use serde::Deserialize;

pub use error::Error;
pub use llm::{ApiProviderConfig, LlmConfig, LlmProviderConfig, McpProviderConfig, ProviderType};

pub type Result<T> = std::result::Result<T, error::Error>;

/// Maximum number of chat rounds the tool loop performs when nothing else is configured.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Reads, expands and validates the configuration file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
        loader::load(path)
    }

    /// Same as [`Config::load`], for configuration already held in memory.
    pub fn from_toml(content: &str) -> crate::Result<Config> {
        loader::parse(content)
    }
}

/// Settings of the tool-call loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Upper bound of chat rounds in one tool loop run.
    pub max_iterations: u32,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::Config;

    #[test]
    fn all_values() {
        let config = indoc! {r#"
            [llm]
            default_provider = "claude"

            [llm.providers.claude]
            type = "anthropic"
            api_key = "sk-ant"
            base_url = "http://localhost:8080/v1"

            [llm.providers.tools]
            type = "mcp"
            url = "http://localhost:3000/mcp"

            [tools]
            max_iterations = 8
        "#};

        let config: Config = toml::from_str(config).unwrap();

        insta::assert_debug_snapshot!(&config, @r#"
        Config {
            llm: LlmConfig {
                default_provider: Some(
                    "claude",
                ),
                providers: {
                    "claude": Anthropic(
                        ApiProviderConfig {
                            api_key: Some(
                                SecretBox<str>([REDACTED]),
                            ),
                            base_url: Some(
                                "http://localhost:8080/v1",
                            ),
                        },
                    ),
                    "tools": Mcp(
                        McpProviderConfig {
                            url: "http://localhost:3000/mcp",
                        },
                    ),
                },
            },
            tools: ToolsConfig {
                max_iterations: 8,
            },
        }
        "#);
    }

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();

        insta::assert_debug_snapshot!(&config, @r#"
        Config {
            llm: LlmConfig {
                default_provider: None,
                providers: {},
            },
            tools: ToolsConfig {
                max_iterations: 100,
            },
        }
        "#);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = toml::from_str::<Config>("[server]\nlisten_address = \"127.0.0.1:80\"").unwrap_err();
        assert!(err.to_string().contains("unknown field `server`"));
    }
}

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use llm::UnifiedProvider;

#[derive(Debug, Parser)]
#[command(name = "unillm", version, about = "Chat with any configured LLM vendor through one interface")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "UNILLM_CONFIG_PATH", default_value = "./unillm.toml")]
    pub config: PathBuf,

    /// Log filter, e.g. "info" or "llm=debug,mcp=debug".
    #[arg(long, env = "UNILLM_LOG", default_value = "info")]
    pub log: String,

    /// Vendor to send the request to. Defaults to the configured default provider.
    #[arg(short, long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Model name as the vendor knows it.
    #[arg(short, long, env = "UNILLM_MODEL")]
    pub model: String,

    /// System prompt.
    #[arg(short, long)]
    pub system: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f32>,

    /// Print the answer while it streams in.
    #[arg(long, conflicts_with = "tools")]
    pub stream: bool,

    /// Let the model call the built-in tools.
    #[arg(long)]
    pub tools: bool,

    /// The user message.
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProviderArg {
    Anthropic,
    Openai,
    Google,
    Mcp,
}

impl From<ProviderArg> for UnifiedProvider {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Anthropic => UnifiedProvider::Anthropic,
            ProviderArg::Openai => UnifiedProvider::OpenAi,
            ProviderArg::Google => UnifiedProvider::Google,
            ProviderArg::Mcp => UnifiedProvider::Mcp,
        }
    }
}

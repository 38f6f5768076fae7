use std::{io::Write, sync::Arc};

use anyhow::Context;
use args::Args;
use clap::Parser;
use config::{Config, LlmProviderConfig};
use futures::StreamExt;
use llm::{LlmService, StreamAggregator, ToolContext, UnifiedRequest, UnifiedResponse};
use mcp::McpProvider;
use tokio_util::sync::CancellationToken;

mod args;
mod logger;
mod tools;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init(&args.log);

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;

    let service = service(&config)?;
    let request = request(&args)?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let response = if args.tools {
        let executor = tools::executor();
        service.chat_with_tools(request, &executor, &ToolContext::new()).await?
    } else if args.stream {
        stream(&service, &request, cancel).await?
    } else {
        service.chat(&request).await?
    };

    if !args.stream {
        println!("{}", response.text());
    }

    report(&response);

    Ok(())
}

fn service(config: &Config) -> anyhow::Result<LlmService> {
    let mut service = LlmService::from_config(&config.llm)?.max_iterations(config.tools.max_iterations);

    for (name, provider_config) in &config.llm.providers {
        if let LlmProviderConfig::Mcp(mcp_config) = provider_config {
            log::debug!("Registering MCP endpoint '{name}' at {}", mcp_config.url);
            service.register(Arc::new(McpProvider::new(name.clone(), mcp_config.clone())?));
        }
    }

    if service.available_providers().is_empty() {
        log::warn!("No provider is available; check the API keys in the configuration");
    }

    Ok(service)
}

fn request(args: &Args) -> anyhow::Result<UnifiedRequest> {
    let mut builder = UnifiedRequest::builder().model(&args.model).user(&args.prompt);

    if let Some(system) = &args.system {
        builder = builder.system(system);
    }

    if let Some(provider) = args.provider {
        builder = builder.provider(provider.into());
    }

    if let Some(max_tokens) = args.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }

    if let Some(temperature) = args.temperature {
        builder = builder.temperature(temperature);
    }

    Ok(builder.build()?)
}

/// Prints text deltas as they arrive and returns the folded response.
async fn stream(
    service: &LlmService,
    request: &UnifiedRequest,
    cancel: CancellationToken,
) -> anyhow::Result<UnifiedResponse> {
    let mut events = service.stream_events(request, cancel.clone()).await?;
    let mut aggregator = StreamAggregator::new();
    let mut stdout = std::io::stdout();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("interrupted"),
            event = events.next() => event,
        };

        let Some(event) = event else {
            break;
        };

        let event = event?;

        if let Some(text) = event.text_delta() {
            write!(stdout, "{text}")?;
            stdout.flush()?;
        }

        aggregator.push(event);
    }

    writeln!(stdout)?;

    Ok(aggregator.finish())
}

fn report(response: &UnifiedResponse) {
    let model = response.model.as_deref().unwrap_or("unknown model");

    match &response.usage {
        Some(usage) => log::info!(
            "{model} finished with {}: {} input, {} output token(s)",
            response.stop_reason,
            usage.input_tokens,
            usage.output_tokens
        ),
        None => log::info!("{model} finished with {}", response.stop_reason),
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Could not listen for Ctrl-C: {e}");
        return;
    }

    log::debug!("Ctrl-C received, cancelling");
    cancel.cancel();
}

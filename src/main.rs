//! memchat - terminal chat companion with persistent, self-summarizing memory

mod agent;

use anyhow::{Context, Result};
use clap::Parser;
use memchat_core::config::{ConfigManager, TelemetryConfig, load_dotenv, require_env};
use memchat_core::core::SessionContext;
use memchat_core::llm::OllamaProvider;
use memchat_core::prompts::resolve_persona;
use memchat_core::storage::build_store;
use memchat_core::ui::{AnsiRenderer, MessageStyle};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "memchat",
    version,
    about = "Chat with a local Ollama model that remembers you across sessions",
    long_about = "Interactive chat against a local Ollama model. Recent messages are kept \
                  verbatim; older ones are folded into a running summary. The conversation \
                  is stored after every turn.\n\nCommands at the prompt: 'exit' or 'quit' to \
                  stop, 'reset' to clear all memory."
)]
struct Cli {}

#[tokio::main]
async fn main() -> ExitCode {
    let _cli = Cli::parse();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            let mut renderer = AnsiRenderer::stdout();
            let _ = renderer.line(MessageStyle::Error, &format!("Error: {err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    load_dotenv();

    let manager = ConfigManager::load().context("Failed to load configuration")?;
    init_tracing(&manager.config().telemetry);
    if let Some(path) = manager.config_path() {
        info!(path = %path.display(), "configuration loaded");
    }
    let config = manager.into_config();

    let project_id = require_env(&config.storage.project_id_env)?;
    let persona = resolve_persona(&config.agent)?;

    let store = build_store(&config.storage, &project_id)
        .await
        .with_context(|| format!("Failed to connect to {} storage", config.storage.backend))?;
    let mut renderer = AnsiRenderer::stdout();
    renderer.line(
        MessageStyle::Info,
        &format!("Connected to {} (project: {project_id})", store.name()),
    )?;

    let provider = Arc::new(OllamaProvider::new(config.ollama.resolved_base_url()));
    let ctx = SessionContext::from_config(&config, store, provider, persona);

    agent::runloop::run_chat(ctx, &config).await
}

/// Logs go to stderr so they never interleave with the transcript on stdout.
/// `RUST_LOG` takes precedence over `telemetry.log_level`.
fn init_tracing(telemetry: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&telemetry.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

//! `formfill` entrypoint.
//!
//! Wires configuration, the provider registry, and the orchestrator into the
//! HTTP server and a few offline utilities.

mod server;

use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use formfill_core::{build_prompt, extract_answers, normalize_payload};
use formfill_runtime::{AnswerOrchestrator, ProviderRegistry, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "formfill", version, about = "Answer form questions with an LLM and deterministic fallbacks")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP endpoint
    Serve {
        /// Address to listen on
        #[arg(long, env = "FORMFILL_ADDR", default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// YAML runtime config
        #[arg(long, env = "FORMFILL_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Answer a payload and print the response envelope
    Answer {
        /// Payload file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// YAML runtime config
        #[arg(long, env = "FORMFILL_CONFIG")]
        config: Option<PathBuf>,

        /// Never call the model
        #[arg(long)]
        offline: bool,
    },

    /// Print the prompt that would be sent for a payload
    Prompt {
        /// Payload file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Extract answers from raw model reply text
    Extract {
        /// Reply file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { addr, config } => {
            let config = RuntimeConfig::load(config.as_deref())?;
            info!(provider = %config.provider, model = %config.model, "Starting formfill");
            server::run(addr, build_orchestrator(config, false)).await
        }
        Command::Answer {
            input,
            config,
            offline,
        } => {
            let config = RuntimeConfig::load(config.as_deref())?;
            let payload = read_payload(&input)?;
            let envelope = build_orchestrator(config, offline)
                .answer_payload(&payload)
                .await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        Command::Prompt { input } => {
            let questions = normalize_payload(&read_payload(&input)?);
            println!("{}", build_prompt(&questions)?);
            Ok(())
        }
        Command::Extract { input } => {
            let reply = read_input(&input)?;
            let answers = extract_answers(&reply).context("No answer array in reply")?;
            println!("{}", serde_json::to_string_pretty(&answers)?);
            Ok(())
        }
    }
}

/// Build the orchestrator, degrading to fallback-only when no provider can be created.
fn build_orchestrator(config: RuntimeConfig, offline: bool) -> AnswerOrchestrator {
    if offline {
        return AnswerOrchestrator::new(None, config);
    }

    let registry = ProviderRegistry::with_defaults();
    let settings = config.provider_config();
    let created = registry
        .validate(&config.provider, &settings)
        .and_then(|()| registry.create(&config.provider, &settings));
    let provider = match created {
        Ok(provider) => Some(provider),
        Err(e) => {
            warn!(provider = %config.provider, error = %e, "Model provider unavailable, answers will use fallbacks");
            None
        }
    };

    AnswerOrchestrator::new(provider, config)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_payload(path: &Path) -> Result<Value> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

//! toolbench: tool-calling demo client for OpenAI-compatible chat completion servers.

mod backend;
mod config;
mod driver;
mod stats;
mod stream;
mod transcript;
mod variant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::ToolbenchConfig;
use driver::{ConversationDriver, DriverOptions, RunOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use tb_llm::LlmClient;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use transcript::Transcript;
use variant::Variant;

#[derive(Debug, Parser)]
#[command(
    name = "toolbench",
    version,
    about = "Tool-calling client for OpenAI-compatible chat completion servers"
)]
struct Cli {
    /// Config file (default: ~/.toolbench/config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// User prompt that seeds the conversation.
    #[arg(long, global = true)]
    prompt: Option<String>,
    /// Maximum completion requests per run; 0 is unbounded.
    #[arg(long, global = true)]
    max_rounds: Option<usize>,
    /// Model id; resolved from the server's model list when unset.
    #[arg(long, global = true)]
    model: Option<String>,
    /// Completion endpoint base URL, e.g. http://127.0.0.1:3000/v1.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Buffered requests against the in-process mock weather tool (default).
    Local,
    /// Streaming requests against wttr.in.
    Stream,
    /// Buffered requests against wttr.in.
    Live,
    /// List the model ids served by the completion endpoint.
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();
    let mut cfg = ToolbenchConfig::load(cli.config.clone()).await?;
    apply_cli_overrides(&mut cfg, &cli);
    cfg.validate()?;

    let command = cli.command.unwrap_or(Command::Local);
    match command {
        Command::Local => run_variant(&cfg, Variant::Local).await,
        Command::Stream => run_variant(&cfg, Variant::Stream).await,
        Command::Live => run_variant(&cfg, Variant::Live).await,
        Command::Models => list_models(&cfg).await,
    }
}

fn apply_cli_overrides(cfg: &mut ToolbenchConfig, cli: &Cli) {
    if let Some(prompt) = &cli.prompt {
        cfg.run.prompt = prompt.clone();
    }
    if let Some(max_rounds) = cli.max_rounds {
        cfg.run.max_rounds = max_rounds;
    }
    if let Some(model) = cli.model.as_deref().filter(|m| !m.trim().is_empty()) {
        cfg.llm.model = Some(model.to_string());
    }
    if let Some(base_url) = &cli.base_url {
        cfg.llm.base_url = base_url.clone();
    }
}

#[tracing::instrument(level = "info", skip_all, fields(variant = variant.name()))]
async fn run_variant(cfg: &ToolbenchConfig, variant: Variant) -> anyhow::Result<ExitCode> {
    let registry = variant.build_registry(cfg)?;
    let client = LlmClient::connect(cfg.llm_client_config())
        .await
        .with_context(|| format!("connect to {}", cfg.llm.base_url))?;
    println!("Using model: {}", client.model());
    tracing::debug!(sampling = ?client.sampling(), "completion client ready");

    let driver = ConversationDriver::new(
        &client,
        &registry,
        DriverOptions {
            mode: variant.mode(),
            max_rounds: cfg.run.round_limit(),
        },
    );
    let stdout = std::io::stdout();
    let mut transcript = Transcript::new(stdout.lock());
    let report = driver.run(&cfg.run.prompt, &mut transcript).await?;
    transcript.breakdown(&report.stats)?;
    tracing::info!(
        history_messages = report.history.len(),
        outcome = ?report.outcome,
        "run complete"
    );

    Ok(exit_code(&report.outcome))
}

fn exit_code(outcome: &RunOutcome) -> ExitCode {
    if outcome.is_done() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn list_models(cfg: &ToolbenchConfig) -> anyhow::Result<ExitCode> {
    let client = LlmClient::new(&cfg.llm_client_config())?;
    let models = client
        .list_models()
        .await
        .with_context(|| format!("list models at {}", cfg.llm.base_url))?;
    if models.is_empty() {
        println!("no models served at {}", cfg.llm.base_url);
        return Ok(ExitCode::FAILURE);
    }
    for model in &models {
        match &model.owned_by {
            Some(owner) => println!("{}\t{owner}", model.id),
            None => println!("{}", model.id),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("info,toolbench=debug,tb_app=debug,tb_llm=debug,tb_tools=debug"),
    };
    let log_format = std::env::var("TOOLBENCH_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported TOOLBENCH_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

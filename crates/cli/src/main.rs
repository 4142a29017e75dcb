mod config_commands;
mod overrides;
mod serve;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    relay_config::RelayConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::overrides::Overrides;

#[derive(Parser)]
#[command(
    name = "llama-relay",
    about = "llama-relay: answer Discord mentions with a local Ollama model",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and the user config dir).
    #[arg(long, global = true, env = "LLAMA_RELAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and relay mentions (default when no subcommand is provided).
    Run,
    /// Validate the effective configuration and report errors/warnings.
    CheckConfig,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// File (explicit or discovered), then environment, then command-line flags.
fn load_effective_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let mut config = match &cli.config {
        Some(path) => relay_config::load_config(path)?,
        None => relay_config::discover_and_load(),
    };
    relay_config::apply_env_overrides(&mut config);
    cli.overrides.apply(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "llama-relay starting");

    let config = load_effective_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => {
            let result = relay_config::validate(&config);
            if result.has_errors() {
                config_commands::report(&result, cli.config.as_deref());
                anyhow::bail!("invalid configuration");
            }
            for d in &result.diagnostics {
                tracing::warn!(path = d.path, "{}", d.message);
            }
            serve::run(config).await
        },
        Some(Commands::CheckConfig) => config_commands::check(&config, cli.config.as_deref()),
    }
}

//! shellbridge entry point.

mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shellbridge_broker::{BrokerConfig, BrokerServer};
use shellbridge_runner::CliRunner;

/// Bridge server relaying an AI coding agent's commands to a remote machine.
#[derive(Parser, Debug)]
#[command(name = "shellbridge", version, about)]
struct Cli {
    /// Listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Listening host
    #[arg(long)]
    host: Option<String>,

    /// Shared secret the remote agent must present
    #[arg(short = 'k', long = "api-key")]
    api_key: Option<String>,

    /// Path to the config file (default: platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = config::BridgeConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(api_key) = cli.api_key {
        config.api_key = api_key;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        key = %key_preview(&config.api_key),
        "starting shellbridge"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: config::BridgeConfig) -> anyhow::Result<()> {
    let runner = CliRunner::new(config.runner.program.clone(), config.runner.args.clone());
    let broker = BrokerServer::new(
        BrokerConfig {
            host: config.host,
            port: config.port,
            api_key: config.api_key,
            ..BrokerConfig::default()
        },
        runner,
    );

    tokio::select! {
        result = broker.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            broker.shutdown();
        }
    }

    broker.hook().stop().await;
    tracing::info!("bridge shut down cleanly");
    Ok(())
}

/// First characters of the shared secret, for the startup banner.
fn key_preview(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}…")
}

//! signal-relay binary entry point.
//!
//! Usage:
//! ```bash
//! signal-relay --config relay.toml
//! signal-relay --bind 127.0.0.1:9000
//! RUST_LOG=signal_relay=debug signal-relay
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use signal_relay::cleanup::spawn_reaper_task;
use signal_relay::config::ConfigError;
use signal_relay::{http, Config, SignalRelay};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "relay.toml";

/// Rendezvous relay for peer-to-peer signaling.
#[derive(Parser, Debug)]
#[command(name = "signal-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (default: relay.toml if present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    tracing::info!("signal-relay v{}", env!("CARGO_PKG_VERSION"));

    let relay = Arc::new(SignalRelay::new(config));
    let _reaper = spawn_reaper_task(Arc::clone(&relay), relay.config().reaper.clone());

    let bind_address = relay.config().server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!(
        "Listening on {} (upgrade path {})",
        listener.local_addr()?,
        relay.config().server.ws_path
    );

    axum::serve(listener, http::build_router(relay))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down");
    Ok(())
}

/// Load the file config, apply CLI overrides and validate the result.
fn resolve_config(cli: &Cli) -> signal_relay::error::Result<Config> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Explicit path must load; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::from_file(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Config::from_file(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

//! eventsync server binary.
//!
//! Loads `eventsync.toml` (writing a commented default on first run), starts
//! the ledger sweep and serves HTTP and WebSocket traffic until Ctrl-C.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use eventsync::{serve, spawn_maintenance, EventsyncConfig, MutationEngine, CONFIG_FILE_NAME};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    EventsyncConfig::write_default_if_missing(&config_path)?;
    if matches.get_flag("init") {
        println!("Config written to {}", config_path.display());
        return Ok(());
    }

    let mut config = EventsyncConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(bind) = matches.get_one::<String>("bind") {
        config.bind = bind.clone();
    }

    init_tracing(&config.log_level);
    if config.users.is_empty() || config.projects.is_empty() {
        warn!(
            target: "eventsync::api",
            path = %config_path.display(),
            "No users or projects configured; every request will be rejected"
        );
    }

    let engine = Arc::new(MutationEngine::from_config(&config));
    let sweeper = spawn_maintenance(Arc::clone(&engine), config.sweep_interval());

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    serve(listener, engine, shutdown_signal()).await?;

    sweeper.abort();
    info!(target: "eventsync::api", "Shut down");
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(target: "eventsync::api", error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!(target: "eventsync::api", "Shutdown requested");
}

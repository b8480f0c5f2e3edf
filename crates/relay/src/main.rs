//! # relay
//!
//! Relay server binary: loads settings, initializes logging and metrics, and
//! serves the hub until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::logging::{LogFormat, init_subscriber};
use relay_server::config::ServerConfig;
use relay_server::server::RelayServer;
use relay_server::shutdown::DEFAULT_SHUTDOWN_TIMEOUT;
use relay_settings::RelaySettings;

/// Real-time WebSocket fan-out hub.
#[derive(Parser, Debug)]
#[command(name = "relay", about = "Real-time WebSocket fan-out hub")]
struct Cli {
    /// Settings file (default: `$RELAY_CONFIG`, else `~/.relay/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Directory served at `/` (overrides settings).
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Do not serve static files.
    #[arg(long, conflicts_with = "static_dir")]
    no_static: bool,

    /// Log filter, e.g. `info` or `relay_server=debug` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Log line format (overrides settings).
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse()
}

impl Cli {
    /// Load settings from the selected file, with `RELAY_*` env overrides.
    fn load_settings(&self) -> Result<RelaySettings> {
        let settings = match &self.config {
            Some(path) => relay_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => relay_settings::load_settings().context("Failed to load settings")?,
        };
        Ok(self.apply(settings))
    }

    /// Apply command-line overrides on top of loaded settings.
    fn apply(&self, mut settings: RelaySettings) -> RelaySettings {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            settings.server.static_dir = Some(dir.to_string_lossy().into_owned());
        }
        if self.no_static {
            settings.server.static_dir = None;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.load_settings()?;

    init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics = relay_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let config = ServerConfig::from(&settings);
    if let Some(dir) = config.static_dir.as_ref().filter(|dir| !dir.is_dir()) {
        tracing::warn!(dir = %dir.display(), "static directory not found, only API routes will resolve");
    }

    let server = RelayServer::new(config).with_metrics(metrics);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("relay listening on http://{addr} (websocket at ws://{addr}/ws)");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!(connections = server.hub().len(), "Shutting down...");
    if !server.shutdown_gracefully(handle, DEFAULT_SHUTDOWN_TIMEOUT).await {
        tracing::warn!("server did not stop within {DEFAULT_SHUTDOWN_TIMEOUT:?}");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

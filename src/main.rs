//! device-relay server entry point.
//!
//! Starts the Axum HTTP server with the command endpoint and the WebSocket
//! channel endpoint, and drains it on Ctrl-C or SIGTERM.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use device_relay::app_state::AppState;
use device_relay::config::{LogFormat, RelayConfig};
use device_relay::server;

/// Command-line overrides for the environment configuration.
#[derive(Parser, Debug)]
#[command(name = "device-relay", version, about = "WebSocket command relay")]
struct Cli {
    /// HTTP service address (overrides `LISTEN_ADDR`).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Seconds to wait for in-flight requests on shutdown (overrides
    /// `GRACEFUL_TIMEOUT_SECS`).
    #[arg(long, value_name = "SECS")]
    graceful_timeout: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut RelayConfig) {
        if let Some(addr) = self.addr {
            config.listen_addr = addr;
        }
        if let Some(secs) = self.graceful_timeout {
            config.graceful_timeout = Duration::from_secs(secs);
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = RelayConfig::from_env().context("invalid LISTEN_ADDR")?;
    cli.apply(&mut config);

    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting device-relay");

    let state = AppState::new(config.endpoint);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(
        listener,
        state,
        config.request_timeout,
        config.graceful_timeout,
        server::shutdown_signal(),
    )
    .await
    .context("server error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

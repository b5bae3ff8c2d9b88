//! STT upload proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  STT PROXY                   │
//!                        │                                              │
//!   POST /api/stt        │  ┌──────────┐   ┌───────────┐   ┌─────────┐  │
//!   ─────────────────────┼─▶│  http    │──▶│  request  │──▶│upstream │──┼──▶ STT service
//!   (multipart upload)   │  │  server  │   │  upload   │   │ client  │  │   (env endpoint)
//!                        │  └──────────┘   └───────────┘   └────┬────┘  │
//!                        │                                      │       │
//!   Download response    │  ┌──────────┐   ┌───────────┐        │       │
//!   ◀────────────────────┼──│ response │◀──│resilience │◀───────┘       │
//!   (streamed)           │  │  relay   │   │ deadline  │                │
//!                        │  └──────────┘   └───────────┘                │
//!                        │                                              │
//!                        │  config · observability · lifecycle          │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use stt_proxy::config::{self, validation, ProxyConfig};
use stt_proxy::lifecycle::{signals, Shutdown};
use stt_proxy::observability::{logging, metrics};
use stt_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "stt-proxy")]
#[command(about = "Forward audio uploads to a speech-to-text service and stream transcripts back", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "STT_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validation::validate_config(&config).map_err(config::ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("stt-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_file = ?args.config,
        bind_address = %config.listener.bind_address,
        max_concurrent_requests = config.listener.max_concurrent_requests,
        upstream_timeout_secs = config.upstream.timeout_secs,
        max_upload_bytes = config.limits.max_upload_bytes,
        "Configuration loaded"
    );
    validation::warn_on_short_timeout(&config);

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

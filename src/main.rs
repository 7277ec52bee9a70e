//! WebSocket gateway (v1)
//!
//! Accepts WebSocket sessions behind reverse proxies and attributes each one
//! to its originating client address.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 WS GATEWAY                   │
//!   Client / Proxy       │  ┌────────┐   ┌─────────┐   ┌─────────────┐  │
//!   ─────────────────────┼─▶│ server │──▶│ real ip │──▶│ origin +    │  │
//!                        │  │ (axum) │   │ resolve │   │ conn limit  │  │
//!                        │  └────────┘   └─────────┘   └──────┬──────┘  │
//!                        │                                    ▼         │
//!   WebSocket frames     │               ┌──────────┐   ┌───────────┐   │
//!   ◀────────────────────┼───────────────│ registry │◀──│  session  │   │
//!                        │               └──────────┘   │ heartbeat │   │
//!                        │                              │ authorize │   │
//!                        │                              └───────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ws_gateway::config::{finalize_config, load_config, GatewayConfig, LogFormat};
use ws_gateway::http::HttpServer;
use ws_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use ws_gateway::observability::{logging, metrics};
use ws_gateway::session::EchoHandler;

#[derive(Parser, Debug)]
#[command(name = "ws-gateway")]
#[command(version, long_about = None)]
#[command(about = "WebSocket gateway with real client address resolution")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. ":3553" or "127.0.0.1:8080".
    #[arg(long)]
    addr: Option<String>,

    /// WebSocket path.
    #[arg(long)]
    path: Option<String>,

    /// Resolve client addresses from X-Forwarded-For / X-Real-IP.
    #[arg(long)]
    real_ip: Option<bool>,

    /// X-Forwarded-For scan direction: left or right.
    #[arg(long)]
    real_ip_mode: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_parser = ["pretty", "json"])]
    log_format: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(addr) = &self.addr {
            config.server.addr = addr.clone();
        }
        if let Some(path) = &self.path {
            config.server.path = path.clone();
        }
        if let Some(enabled) = self.real_ip {
            config.server.real_ip.enabled = enabled;
        }
        if let Some(mode) = &self.real_ip_mode {
            config.server.real_ip.mode = mode.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        match self.log_format.as_deref() {
            Some("json") => config.observability.log_format = LogFormat::Json,
            Some("pretty") => config.observability.log_format = LogFormat::Pretty,
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    cli.apply(&mut config);

    logging::init_logging(&config.observability)?;
    tracing::info!("ws-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let config = finalize_config(config)?;
    tracing::info!(
        addr = %config.server.addr,
        path = %config.server.path,
        max_conn_num = config.server.max_conn_num,
        tls = config.server.tls.is_some(),
        heartbeat_interval_secs = config.server.heartbeat_interval_secs,
        heartbeat_mechanism = ?config.server.heartbeat_mechanism,
        authorize_timeout_secs = config.server.authorize_timeout_secs,
        real_ip_enabled = config.server.real_ip.enabled,
        real_ip_mode = %config.server.real_ip.mode(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, Arc::new(EchoHandler));
    server.serve(shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

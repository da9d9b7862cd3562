//! Metering gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                 REQUEST METER                    │
//!    Client Request    │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!    ──────────────────┼─▶│   net   │──▶│   http   │──▶│ RequestFacade│   │
//!                      │  │conn info│   │  server  │   │ view + meter │   │
//!                      │  └─────────┘   └──────────┘   └──────┬───────┘   │
//!                      │                                      │           │
//!    Meter Report      │                 ┌─────────┐          ▼           │
//!    ◀─────────────────┼─────────────────│ report  │◀── body read, finish │
//!                      │                 └─────────┘                      │
//!                      │  ┌────────┐ ┌───────────────┐ ┌───────────┐      │
//!                      │  │ config │ │ observability │ │ lifecycle │      │
//!                      │  └────────┘ └───────────────┘ └───────────┘      │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::{lookup_host, TcpListener};

use request_meter::config::Options;
use request_meter::http::HttpServer;
use request_meter::lifecycle::{signals, Shutdown};
use request_meter::net::tls::load_tls_config;
use request_meter::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Options::parse().into_config()?;
    logging::init_logging(&config)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "request-meter starting");
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        stage = ?config.stage,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let tls = load_tls_config(config.listener.tls.as_ref()).await?;
    let bind_address = config.listener.bind_address();
    let server = HttpServer::new(config);

    match tls {
        Some(tls) => {
            let addr: SocketAddr = lookup_host(&bind_address)
                .await?
                .next()
                .ok_or_else(|| format!("no address for {bind_address}"))?;
            server.run_tls(addr, tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

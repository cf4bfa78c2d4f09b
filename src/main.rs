//! route-engine server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ axum server ──▶ Dispatcher ──▶ Router::lookup
//!                                          │              │
//!                                          │         pattern + constraints
//!                                          ▼
//!                                  prebuilt middleware pipeline
//!                                          │
//!                                          ▼
//!                                  controller (resolved by name)
//!     Client Response                      │
//!     ◀────────────────────────────────────┘
//! ```
//!
//! Startup order: config → logging → metrics → router → listener.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use route_engine::config::{load_config, EngineConfig};
use route_engine::http::HttpServer;
use route_engine::lifecycle::{bootstrap, Shutdown};
use route_engine::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "route-engine")]
#[command(about = "HTTP routing and middleware-composition engine", long_about = None)]
struct Args {
    /// TOML config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-engine starting");

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let dispatcher = Arc::new(bootstrap(&config)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(dispatcher);
    let serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown
        .serve_until(async move { serving.await? }, tokio::signal::ctrl_c())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

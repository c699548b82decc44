//! Scale-to-zero HTTP gateway.
//!
//! Routes requests for scaled HTTP applications, holds them while a backend
//! scales up from zero, and reports per-route load to the autoscaler.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────────────────┐
//!                  │                         GATEWAY                           │
//!                  │                                                           │
//!   Client ───────▶│  http::server ──▶ http::pipeline                          │
//!                  │                     │ routing::RoutingTable  (ArcSwap)    │
//!                  │                     │ counter::RouteCounter  (atomics)    │
//!                  │                     │ readiness::ReadinessCache (watch)   │
//!                  │                     │ net::probe (cold starts)            │
//!                  │                     ▼                                     │
//!   Client ◀───────│  http::forward (pooled hyper client, net::resolver) ◀────┼──── Backend
//!                  │                                                           │
//!                  │  config file ──▶ config::watcher ──▶ control::ControlPlane│
//!                  │                                                           │
//!   Autoscaler ───▶│  admin (/queue, /livez, /readyz, /debug/stats)            │
//!   Prometheus ───▶│  observability::metrics exporter                          │
//!                  └───────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use zeroscale_gateway::config::{load_config, load_default};
use zeroscale_gateway::observability::logging::init_logging;
use zeroscale_gateway::{Gateway, Shutdown};

#[derive(Parser)]
#[command(name = "zeroscale-gateway")]
#[command(about = "Scale-to-zero HTTP gateway", long_about = None)]
struct Cli {
    /// TOML config file; watched for cluster-state changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default()?,
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "zeroscale-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        admin_address = %config.admin.bind_address,
        routes = config.cluster.routes.len(),
        condition_wait_ms = config.timeouts.condition_wait_ms,
        "Configuration loaded"
    );

    let gateway = Gateway::new(config, Shutdown::new());
    gateway.run(cli.config.as_deref()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

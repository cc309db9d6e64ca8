//! Crowdfund gateway.
//!
//! Serves the RPC endpoint lookup and the same-origin proxies the client
//! uses to reach the Solana RPC node and the crowdfunding backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────┐
//!                        │             CROWDFUND GATEWAY             │
//!   Client request       │  ┌────────┐   ┌─────────────────────┐    │
//!   ─────────────────────┼─▶│  http  │──▶│ /api/solana-rpc      │    │
//!                        │  │ server │   │   rpc_config         │    │
//!                        │  └───┬────┘   ├─────────────────────┤    │
//!                        │      │        │ /api/solana-rpc/proxy│────┼──▶ Solana RPC
//!                        │      │        ├─────────────────────┤    │
//!                        │      └───────▶│ /api/backend/*       │────┼──▶ Backend
//!                        │               └─────────────────────┘    │
//!                        │  config · observability · lifecycle       │
//!                        └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use tokio::net::TcpListener;

use crowdfund_gateway::config::load_or_default;
use crowdfund_gateway::lifecycle::{signals, Shutdown};
use crowdfund_gateway::observability::{logging, metrics};
use crowdfund_gateway::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_or_default(config_path.as_deref())?;

    logging::init(&logging::directives_for(&config.observability.log_level));
    tracing::info!("crowdfund-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        cluster = %config.network.cluster,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

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
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::trigger_on_signal(&signal_shutdown).await;
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

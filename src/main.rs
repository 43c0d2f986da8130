//! HTTP ingress dispatcher.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net (bind, TLS) ──▶ http server ──▶ dispatch
//!                                                           │
//!                         ┌─────────────┬──────────────────┼───────────────┐
//!                         ▼             ▼                  ▼               ▼
//!                     404 / 405     CORS preflight     decode body      handler
//!                                                                          │
//!     Client Response                                                      ▼
//!     ◀────────────────────────────────────────────────────────────── reply encoder
//! ```
//!
//! Every configured route is served by the echo handler, which replies
//! with the canonical request as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use rest_ingress::config::{load_config, IngressConfig};
use rest_ingress::cors::{CorsPolicy, CORS_PREFIX};
use rest_ingress::lifecycle::{shutdown_signal, HandlerBinding, IngressServer};
use rest_ingress::observability::{init_logging, metrics};
use rest_ingress::EchoHandler;

#[derive(Parser)]
#[command(name = "rest-ingress")]
#[command(about = "HTTP ingress dispatcher", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => IngressConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    init_logging(&config.observability)?;
    tracing::info!("rest-ingress v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        routes = config.routes.len(),
        tls = config.listener.tls.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if config.routes.is_empty() {
        tracing::warn!("No routes configured; every request will get 404");
    }

    let cors = CorsPolicy::from_env(CORS_PREFIX)?;
    let echo = Arc::new(EchoHandler);
    let bindings = config
        .routes
        .iter()
        .cloned()
        .map(|route| HandlerBinding::new(route, echo.clone()))
        .collect();

    let mut server = IngressServer::new(config);
    server.initialize(bindings, cors)?;
    server.start().await?;

    shutdown_signal().await;
    server.stop().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

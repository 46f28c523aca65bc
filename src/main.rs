//! Multi-tenant SaaS service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ correlation ─▶ error normalizer ─▶ tenant/user ─▶ interceptor ─▶ limits ─▶ handlers
//!                          │                │                                 │
//!     Client Response      │                │                                 ▼
//!     ◀──────────────  x-correlation-id   ErrorEnvelope                 StructuredLogger ─▶ LogSink
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use saas_scaffold::config::{apply_overrides, load_config, AppConfig};
use saas_scaffold::observability::{logging, metrics, TracingSink};
use saas_scaffold::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "saas-scaffold")]
#[command(about = "Multi-tenant SaaS API service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let config = apply_overrides(config, cli.bind)?;

    logging::init_tracing(&config.observability);
    logging::install_panic_hook();

    tracing::info!("saas-scaffold v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        tenant_header = %config.tenancy.tenant_header,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config, Arc::new(TracingSink));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

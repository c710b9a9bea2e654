//! Consultation API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ──────────────▶ request id / trace
//!                     → security headers (on every response)
//!                     → CORS guard + CORS headers
//!                     → rate limiter (per client, sliding window)
//!                     → API-key gate (API writes only)
//!                     → agent detector (RequestContext)
//!                     → sanitizer (JSON bodies)
//!                     → timeout / body limit
//!                     → handlers (consultations, business profiles, analyses)
//!                     → in-memory store
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use consult_gateway::config::{load_config, GatewayConfig};
use consult_gateway::observability::{logging, metrics};
use consult_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "consult-gateway")]
#[command(about = "Consultation API behind a request-admission chain", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!("consult-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_file = ?args.config,
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

// crates/stitch-gateway/src/main.rs
//
// Binary entrypoint for the Stitch gateway.
//
// Parses CLI arguments, loads configuration, initializes tracing, builds
// the shared gateway state, and serves the router until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use stitch_gateway::telemetry::init_tracing;
use stitch_gateway::{router, GatewayConfig, GatewayState};

/// Stitch gateway: one GraphQL surface over RPC backends.
#[derive(Parser, Debug)]
#[command(name = "stitch-gateway", version = "0.1.0", about = "Stitch GraphQL gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "stitch.toml")]
    config: String,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load before tracing is up so log_level can come from the file; the
    // outcome is reported once the subscriber exists.
    let loaded = GatewayConfig::load(&args.config).map_err(|e| e.to_string());
    let mut config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => GatewayConfig::default(),
    };

    init_tracing(&config.log_level, &config.log_format);

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", args.config),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
    }

    // CLI --port flag overrides the config file value.
    if let Some(port) = args.port {
        config.port = port;
    }

    config.validate()?;

    tracing::info!("Stitch Gateway v0.1.0");
    tracing::info!("Listening on {}:{}", config.host, config.port);
    tracing::info!(
        "RPC timeout: {} ms, pooling: {}",
        config.rpc.timeout_ms,
        config.rpc.pool_connections
    );

    let state = GatewayState::from_config(&config).await?;
    if state.service_names().is_empty() {
        tracing::warn!("No services configured; every relay will fail with SERVICE_ERROR");
    }

    let app = router(Arc::new(state));
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

//! Flussonic Exporter Binary Entry Point
//!
//! Core functionality is provided by the `flussonic_exporter` library crate.

use clap::Parser;
use flussonic_exporter::{
    collector::{CollectorRegistry, FlussonicCollector},
    config::AppConfig,
    exposition::Exposition,
    logging,
    server::{AppState, create_router},
    storage::TargetCache,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Flussonic Exporter - Prometheus exporter for Flussonic media servers
#[derive(Parser, Debug)]
#[command(name = "flussonic_exporter", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (default: search the standard locations)
    #[arg(short, long, env = "FLUSSONIC_EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides config file)
    #[arg(long, env = "FLUSSONIC_EXPORTER_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Log level (overrides config file)
    #[arg(long, env = "FLUSSONIC_EXPORTER_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from file
    let (config_path, mut config) = match cli.config {
        Some(path) => {
            let config = AppConfig::load(&path)?;
            (path, config)
        }
        None => AppConfig::discover()?,
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(addr) = cli.listen_address {
        config.listen_address = addr;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;

    let _log_guards = logging::init(&config.log_level, config.log_path.as_deref())?;

    tracing::info!("Flussonic Exporter {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_path.display(), "Configuration loaded");

    let cache = Arc::new(TargetCache::new());

    // Register one scrape job per target
    let registry = CollectorRegistry::new().await?;
    for target in config.targets()? {
        let collector = FlussonicCollector::from_target(target, Arc::clone(&cache))?;
        tracing::info!(
            instance = %collector.target().instance_name,
            url = %collector.target().url,
            interval = ?collector.target().scrape_interval,
            "register task Scrape {}",
            collector.target().instance_name
        );
        registry.spawn(collector).await?;
    }
    registry.start().await?;

    let app_state = AppState {
        exposition: Exposition::new(Arc::clone(&cache), config.exporter_metrics)?,
        cache,
        metrics_path: config.metrics_path.clone(),
    };
    let app = create_router(app_state);

    let addr = config.socket_addr()?;
    tracing::info!(metrics_path = %config.metrics_path, "Listening on http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(registry: CollectorRegistry) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!("Shutting down collectors...");
    if let Err(e) = registry.shutdown().await {
        tracing::error!("Failed to shutdown collectors: {}", e);
    }
}

//! Rain forecast server
//!
//! Loads the artifact bundle once at startup and serves the prediction
//! form, the JSON API and health/metrics endpoints.

use anyhow::{Context, Result};
use forecast_lib::{
    health::{components, HealthRegistry},
    ArtifactBundle, Forecaster, StructuredLogger,
};
use forecast_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting rain-forecast");

    let config = ServerConfig::load()?;
    info!(bundle_path = %config.bundle_path, port = config.port, "Server configured");

    let logger = StructuredLogger::new(&config.instance);

    // A bundle that fails to load or validate is fatal
    let bundle = ArtifactBundle::load_verified(&config.bundle_path, config.bundle_sha256.as_deref())
        .with_context(|| format!("loading artifact bundle from {}", config.bundle_path))?;
    logger.log_bundle_loaded(
        &config.bundle_path,
        bundle.version(),
        bundle.model().kind(),
        bundle.n_features(),
    );
    let bundle_version = bundle.version().to_string();

    let forecaster = Arc::new(Forecaster::with_logger(Arc::new(bundle), logger.clone()));

    let health_registry = HealthRegistry::new();
    health_registry.register(components::BUNDLE).await;
    health_registry.register(components::PIPELINE).await;
    health_registry.set_ready(&bundle_version).await;

    logger.log_startup(APP_VERSION, &bundle_version);

    let app_state = Arc::new(
        api::AppState::new(forecaster, health_registry)
            .context("Failed to compile form template")?,
    );

    let shutdown_logger = logger.clone();
    api::serve(config.port, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shut down");
    Ok(())
}

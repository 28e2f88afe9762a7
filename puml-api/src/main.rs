//! PUML API Server Entry Point
//!
//! Bootstraps configuration, builds the render cache, starts the reaper and
//! serves HTTP until Ctrl-C, then stops the reaper and wipes the cache.

use std::sync::Arc;

use puml_api::telemetry::{init_tracing, TelemetryConfig};
use puml_api::{
    create_api_router, ApiError, ApiResult, AppState, ImageService, Lifecycle, PlantUmlCli,
    ServiceConfig,
};
use puml_core::SystemClock;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        scratch_dir = %config.cache.scratch_dir.display(),
        plantuml_bin = %config.render.plantuml_bin.display(),
        eviction_window_secs = config.reaper.eviction_window.as_secs(),
        reaper_period_secs = config.reaper.period.as_secs(),
        memory_max_entries = config.cache.memory_max_entries,
        "Configuration loaded"
    );

    let renderer = Arc::new(PlantUmlCli::new(&config.render.plantuml_bin));
    let service = Arc::new(ImageService::from_config(
        &config,
        SystemClock::shared(),
        renderer,
    )?);
    let lifecycle = Lifecycle::start(Arc::clone(&service), config.reaper.clone());

    let app = create_api_router(AppState::new(service, config.http.clone()));

    let addr = config.http.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, "Starting PUML API server");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)));

    // Wipe the cache even if the server failed.
    let wiped = lifecycle.shutdown().await;
    served?;
    wiped?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

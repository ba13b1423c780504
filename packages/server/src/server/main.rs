// Main entry point for the metasearch server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::kernel::{self, ServerDeps};
use server_core::server::build_app;
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Periscope metasearch engine");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(engines_disabled = config.disabled_engines.len(), "Configuration loaded");

    // Wire up process-wide services
    let deps = Arc::new(ServerDeps::build(config.clone()).context("Failed to build server dependencies")?);
    tracing::info!(engines = deps.registry.len(), "Engine registry ready");

    // Start the engine liveness probe scheduler; keep the handle alive.
    let _scheduler = kernel::scheduled_tasks::start_scheduler(
        deps.registry.clone(),
        kernel::http_client()?,
        deps.status_board.clone(),
        deps.scheduler_handle.clone(),
    )
    .await
    .context("Failed to start scheduler")?;

    // Build application
    let app = build_app(deps);

    // Start server
    let addr = format!("{}:{}", config.bind_addr, config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Search API: http://localhost:{}/api/v1/search?q=", config.port);
    tracing::info!("Health check: http://localhost:{}/api/v1/healthz", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

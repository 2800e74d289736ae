mod config;
mod errors;
mod routes;

use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::AppError;
use crate::routes::app_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_harness=debug,tower_http=debug".into()),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = ServerConfig::from_env();
    if let Err(e) = config.ensure_assets() {
        warn!("{e}; build the frontend with `trunk build` or set ASSETS_DIR");
    }

    // ── Router ────────────────────────────────────────────────────────────────
    let app = app_router(&config);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind { addr: addr.clone(), source })?;

    info!("Frontend server running at http://localhost:{}", config.port);
    info!("Backend server should be running at {}", config.backend_url);
    info!("Serving assets from {}", config.assets_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! llamagate - lazily starts llama-server backends and proxies requests to them.

use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use llamagate::{api, probe, process::TokioProcessControl, AppState, Catalog, Config, RunnerManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure config.toml exists or set LLAMAGATE__* environment variables.",
            e
        )
    })?;

    let catalog = Catalog::new(config.models.clone());
    tracing::info!(
        models = catalog.len(),
        idle_timeout_secs = config.lifecycle.idle_timeout_secs,
        "starting llamagate"
    );
    if catalog.is_empty() {
        tracing::warn!("no models configured, only catalog endpoints will respond");
    }

    // Wire the lifecycle core
    let control = Arc::new(TokioProcessControl::new(config.lifecycle.log_backend_output));
    let probe = probe::from_config(&config.lifecycle);
    let manager = RunnerManager::new(
        catalog.clone(),
        control,
        probe,
        config.lifecycle.clone(),
    );

    let state = Arc::new(AppState::new(config.clone(), catalog, manager.clone()));

    // Build router
    let app = api::router()
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Don't leave an orphaned backend behind
    manager.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

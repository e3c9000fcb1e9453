//! socketon server entry point.
//!
//! Starts the hub control loop and the Axum HTTP server with the WebSocket
//! endpoint.

use tracing_subscriber::EnvFilter;

use socketon::api;
use socketon::app_state::AppState;
use socketon::config::ServerConfig;
use socketon::hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting socketon");

    // Build hub
    let hub = Hub::new(config.hub.clone()).with_error_observer(|connection_id, error| {
        tracing::warn!(%connection_id, %error, "dropped frame");
    });
    let handle = hub.handle();
    let hub_task = tokio::spawn(hub.start());

    // Build router
    let app = api::build_app(AppState::new(handle.clone()));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Live connections are not closed here; the process exit takes them down.
    if handle.stop().await.is_ok() {
        let _ = hub_task.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

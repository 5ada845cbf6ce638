//! greeting-gateway server entry point.
//!
//! Starts the Axum HTTP server with the STOMP WebSocket endpoint.

use greeting_gateway::api;
use greeting_gateway::app_state::AppState;
use greeting_gateway::config::{GatewayConfig, LogFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (also loads .env, so RUST_LOG may come from it)
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let listen_addr = config.listen_addr;
    tracing::info!(
        addr = %listen_addr,
        endpoint = %config.ws_endpoint,
        delay = ?config.greeting_delay,
        "starting greeting-gateway"
    );

    // Build state and router
    let app = api::build_app(AppState::from_config(config));

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

//! System endpoints: health check and destination catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the server answers.
    pub status: String,
    /// RFC 3339 server time.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}

/// One registered message route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RouteInfo {
    /// Destination clients SEND to.
    pub inbound: String,
    /// Destination the reply is published to.
    pub outbound: String,
}

/// Routing catalog for STOMP clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DestinationCatalog {
    /// WebSocket endpoint path.
    pub endpoint: String,
    /// Prefix of destinations clients may subscribe and publish to.
    pub broker_prefix: String,
    /// Registered application routes.
    pub routes: Vec<RouteInfo>,
    /// Simulated greeting latency in milliseconds.
    pub greeting_delay_ms: u64,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/destinations` — List message routes.
#[utoipa::path(
    get,
    path = "/config/destinations",
    tag = "System",
    summary = "List message routes",
    description = "Returns the WebSocket endpoint, the broker prefix, and every registered inbound → outbound route.",
    responses(
        (status = 200, description = "Routing catalog", body = DestinationCatalog),
    )
)]
pub async fn destinations_handler(State(state): State<AppState>) -> impl IntoResponse {
    let routes: Vec<RouteInfo> = state
        .router
        .routes()
        .into_iter()
        .map(|(inbound, outbound)| RouteInfo { inbound, outbound })
        .collect();
    let greeting_delay_ms = u64::try_from(state.config.greeting_delay.as_millis()).unwrap_or(u64::MAX);

    (
        StatusCode::OK,
        Json(DestinationCatalog {
            endpoint: state.config.ws_endpoint.clone(),
            broker_prefix: state.router.broker_prefix().to_owned(),
            routes,
            greeting_delay_ms,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/destinations", get(destinations_handler))
}

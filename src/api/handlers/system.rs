//! System endpoints: health check and hub statistics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::{ErrorResponse, HubError};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` when the process answers.
    pub status: String,
    /// Current server time (RFC 3339).
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the host started serving.
    pub uptime_secs: i64,
}

/// Hub statistics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Number of live connections.
    pub connections: usize,
    /// Current server time (RFC 3339).
    pub timestamp: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, uptime and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: now.to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: (now - state.started_at).num_seconds(),
        }),
    )
}

/// `GET /stats` — Live connection count.
///
/// # Errors
///
/// Returns [`HubError::HubStopped`] (503) once the hub control loop has exited.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "System",
    summary = "Hub statistics",
    description = "Returns the number of connections currently registered with the hub.",
    responses(
        (status = 200, description = "Hub is running", body = StatsResponse),
        (status = 503, description = "Hub control loop has stopped", body = ErrorResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> Result<impl IntoResponse, HubError> {
    let members = state.hub.members().await?;
    Ok((
        StatusCode::OK,
        Json(StatsResponse {
            connections: members.len(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    ))
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
}

//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};

use crate::ingestion::HealthStatus;
use crate::state::AppState;

/// GET /health - Service health with uptime and active session count.
async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let connections = state.sessions().count().await;
    Json(state.ingestion().health(connections))
}

/// Build health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

//! Route definitions for the HTTP API.

pub mod health;
pub mod ingest;
pub mod mcp;
pub mod records;
pub mod sse;

use axum::Router;

use crate::state::AppState;

/// Build the complete router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(ingest::routes())
        .merge(records::routes())
        .merge(mcp::routes())
        .merge(sse::routes())
        .with_state(state)
}

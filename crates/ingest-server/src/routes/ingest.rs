//! Direct (non-protocol) ingestion endpoint.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

use ingest_core::IngestionStatus;

use crate::ingestion::{IngestionRequest, IngestionResponse};
use crate::state::AppState;

/// POST /ingest - Validate and store content.
///
/// Returns 202 Accepted on success, 400 with the validation issues on
/// failure. Either way an `ingest:result` event is pushed for SSE
/// subscribers.
async fn ingest_content(
    State(state): State<AppState>,
    Json(request): Json<IngestionRequest>,
) -> Response {
    let response = state.ingestion().ingest(request).await;

    state
        .events()
        .push_event(
            "ingest:result",
            json!({
                "id": response.id,
                "status": response.status,
                "contentType": response.content_type.map_or("unknown", |t| t.as_str()),
                "timestamp": response.timestamp,
            }),
        )
        .await;

    let status = if response.status == IngestionStatus::Failed {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::ACCEPTED
    };
    (status, Json::<IngestionResponse>(response)).into_response()
}

/// Build ingestion routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ingest", post(ingest_content))
}

//! Ingestion record listing and lookup.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::ingestion::IngestionRecord;
use crate::state::AppState;

/// Query parameters for GET /records.
#[derive(Debug, Deserialize)]
struct RecordsQuery {
    /// Filter by status wire name; unrecognized values match nothing.
    status: Option<String>,
}

/// GET /records - All records, optionally filtered by status.
async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Json<Vec<IngestionRecord>> {
    let records = match query.status.as_deref() {
        Some(status) => state.ingestion().records_by_status(status).await,
        None => state.ingestion().records().await,
    };
    Json(records)
}

/// GET /records/{id} - One record by id.
async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<IngestionRecord>> {
    state
        .ingestion()
        .record(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Record with id {id} not found")))
}

/// Build record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records))
        .route("/records/{id}", get(get_record))
}

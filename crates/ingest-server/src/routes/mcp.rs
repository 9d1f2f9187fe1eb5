//! Protocol endpoint: metadata, session-addressed requests, termination.
//!
//! Sessions are addressed with the `mcp-session-id` header. A POST without
//! the header is accepted only when it is an `initialize` request, in which
//! case a fresh session is created and its id returned on the response
//! header for the caller to round-trip. A present-but-unknown id is always
//! rejected; the registry never creates a session implicitly.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::protocol::{
    PROTOCOL_VERSION, RpcRequest, RpcResponse, SERVER_DESCRIPTION, SERVER_NAME,
};
use crate::session::SessionHandle;
use crate::state::AppState;

/// Header carrying the session identifier.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

fn session_id_of(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn invalid_session() -> ApiError {
    ApiError::BadRequest("invalid or missing session id".to_string())
}

/// Attach the session id header to a protocol response.
fn rpc_response(session_id: &str, response: RpcResponse) -> Response {
    let mut http_response = Json(response).into_response();
    if let Ok(value) = HeaderValue::from_str(session_id) {
        http_response
            .headers_mut()
            .insert(SESSION_ID_HEADER, value);
    }
    http_response
}

/// GET /mcp - Server metadata, capabilities, and live statistics.
async fn metadata(State(state): State<AppState>) -> Json<Value> {
    let ingestion_stats = state.ingestion().stats().await;
    let event_stats = state.events().stats().await;
    let auth = state.auth_config();

    Json(json!({
        "name": SERVER_NAME,
        "version": crate::ingestion::SERVICE_VERSION,
        "description": SERVER_DESCRIPTION,
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": [
                {
                    "name": "ingest_content",
                    "description": "Ingest and validate content for processing"
                },
                {
                    "name": "get_ingestion_stats",
                    "description": "Get ingestion service statistics"
                }
            ],
            "resources": [
                {
                    "uri": "ingestion://status",
                    "name": "Ingestion Status",
                    "description": "Current status of the ingestion service"
                },
                {
                    "uri": "ingestion://records",
                    "name": "Ingestion Records",
                    "description": "All ingestion records with filtering support"
                }
            ]
        },
        "endpoints": {
            "http": {
                "health": "/health",
                "ingest": "/ingest",
                "records": "/records",
                "recordById": "/records/{id}"
            },
            "sse": "/sse",
            "mcp": "/mcp"
        },
        "metadata": {
            "authEnabled": auth.enabled,
            "authMethod": auth.method,
            "transport": "http",
            "port": state.config().port,
            "stats": {
                "ingestion": ingestion_stats,
                "events": event_stats,
                "sessions": state.sessions().count().await
            }
        }
    }))
}

/// POST /mcp - Route a protocol request to its session transport.
async fn session_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RpcRequest>,
) -> ApiResult<Response> {
    let handle = match session_id_of(&headers) {
        Some(id) => state.sessions().get(id).await.ok_or_else(invalid_session)?,
        None => {
            // Only an initialize request may open a session.
            if request.method != "initialize" {
                return Err(invalid_session());
            }
            let handle = state.sessions().create(state.protocol_handler()).await;
            tracing::info!(session_id = %handle.id(), "initialize request opened session");
            handle
        }
    };

    dispatch(&handle, request).await
}

/// DELETE /mcp - Terminate a session.
///
/// Termination is routed through the transport like any other operation;
/// the transport decides to close and the registry entry follows.
async fn session_terminate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let id = session_id_of(&headers).ok_or_else(invalid_session)?;
    let handle = state.sessions().get(id).await.ok_or_else(invalid_session)?;
    dispatch(&handle, RpcRequest::internal("shutdown")).await
}

async fn dispatch(handle: &SessionHandle, request: RpcRequest) -> ApiResult<Response> {
    let response = handle
        .request(request)
        .await
        .map_err(|_| invalid_session())?;
    Ok(rpc_response(handle.id(), response))
}

/// Build protocol routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/mcp",
        get(metadata).post(session_request).delete(session_terminate),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ServerConfig};
    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn body_json(body: Body) -> Value {
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app() -> (AppState, axum::Router) {
        let state = AppState::new(ServerConfig::default(), AuthConfig::disabled());
        (state.clone(), crate::routes::build_router(state))
    }

    fn rpc_post(session_id: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json");
        if let Some(id) = session_id {
            builder = builder.header(SESSION_ID_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn initialize_body() -> Value {
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})
    }

    #[tokio::test]
    async fn test_metadata_reports_capabilities() {
        let (_, app) = app();
        let request = Request::builder().uri("/mcp").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response.into_body()).await;
        assert_eq!(body["name"], SERVER_NAME);
        assert_eq!(body["metadata"]["authEnabled"], json!(false));
    }

    #[tokio::test]
    async fn test_initialize_without_session_id_creates_session() {
        let (state, app) = app();
        let response = app.oneshot(rpc_post(None, initialize_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(!session_id.is_empty());
        assert_eq!(state.sessions().count().await, 1);

        let body = body_json(response.into_body()).await;
        assert_eq!(body["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_known_session_id_reaches_same_transport() {
        let (_, app) = app();
        let response = app
            .clone()
            .oneshot(rpc_post(None, initialize_body()))
            .await
            .unwrap();
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let follow_up = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list", "params": {}});
        let response = app
            .oneshot(rpc_post(Some(&session_id), follow_up))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response.into_body()).await;
        assert!(body["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn test_unknown_session_id_rejected_without_creation() {
        let (state, app) = app();
        let response = app
            .oneshot(rpc_post(Some("not-a-session"), initialize_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response.into_body()).await;
        assert_eq!(body["message"], "invalid or missing session id");
        assert_eq!(state.sessions().count().await, 0);
    }

    #[tokio::test]
    async fn test_non_initialize_without_session_id_rejected() {
        let (state, app) = app();
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}});
        let response = app.oneshot(rpc_post(None, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.sessions().count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_terminates_session() {
        let (state, app) = app();
        let response = app
            .clone()
            .oneshot(rpc_post(None, initialize_body()))
            .await
            .unwrap();
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let request = Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header(SESSION_ID_HEADER, &session_id)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Transport removes its own entry after answering.
        for _ in 0..50 {
            if state.sessions().count().await == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(state.sessions().count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_without_session_id_rejected() {
        let (_, app) = app();
        let request = Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! Entry point for the ingest-server binary.

use std::sync::Arc;

use axum::middleware;
use http::HeaderName;
use ingest_server::{
    auth::factory::{AuthGate, auth_middleware},
    config::{AuthConfig, ServerConfig},
    middleware::request_id::{propagate_request_id, request_id_layer},
    routes,
    routes::mcp::SESSION_ID_HEADER,
    state::AppState,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = ServerConfig::from_env()?;
    let auth_config = AuthConfig::from_env();

    // Initialize tracing
    init_tracing(&config.log_level);

    tracing::info!("Starting ingest-server");
    tracing::info!(
        "Configuration: port={}, log_level={}, max_events={}",
        config.port,
        config.log_level,
        config.max_events
    );

    // Authentication gate; a misconfigured gate still serves, rejecting
    // every request with 500 until the configuration is fixed.
    let gate = Arc::new(AuthGate::new(&auth_config));

    // Build application state
    let state = AppState::new(config.clone(), auth_config);

    // Build CORS layer
    let cors = build_cors_layer(&config.cors_allowed_origins);

    // Build router with middleware. Authentication sits closest to the
    // routes so every endpoint, health checks included, is behind it.
    let app = routes::build_router(state.clone())
        .layer(middleware::from_fn_with_state(gate, auth_middleware))
        .layer(middleware::from_fn(propagate_request_id))
        .layer(request_id_layer())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Create listener
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close SSE subscribers and session transports before exit.
    state.drain().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build CORS layer from configuration.
///
/// The session id header is exposed in both modes so browser clients can
/// read it off the initialize response.
fn build_cors_layer(allowed_origins: &str) -> CorsLayer {
    let exposed = [HeaderName::from_static(SESSION_ID_HEADER)];

    if allowed_origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed)
    } else {
        // Parse comma-separated origins
        let origins: Vec<_> = allowed_origins
            .split(',')
            .map(|s| s.trim().parse().expect("Invalid CORS origin"))
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed)
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

//! ingest-server: MCP-style HTTP server for the content ingestion service
//!
//! This crate provides:
//! - REST endpoints for ingestion, record lookup, and health checks
//! - A JSON-RPC protocol endpoint with header-addressed sessions
//! - Server-Sent Events (SSE) with backlog replay for late subscribers
//! - Pluggable authentication (none, API key, JWT) applied as middleware
//!
//! # Architecture
//!
//! The server is built on Axum with a middleware stack for:
//! - Request tracing and logging
//! - CORS handling
//! - Request ID generation
//! - Authentication
//!
//! # Usage
//!
//! ```rust,ignore
//! use ingest_server::{config::ServerConfig, routes, state::AppState};
//!
//! let config = ServerConfig::from_env()?;
//! let state = AppState::new(config, ingest_server::config::AuthConfig::from_env());
//! let app = routes::build_router(state);
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod middleware;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod state;

// Re-exports for convenience
pub use config::{AuthConfig, ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use events::EventQueue;
pub use state::AppState;

// Re-export dependent crates
pub use ingest_core;

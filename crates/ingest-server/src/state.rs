//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{AuthConfig, ServerConfig};
use crate::events::EventQueue;
use crate::ingestion::IngestionService;
use crate::protocol::ProtocolHandler;
use crate::session::SessionRegistry;

/// Application state shared across all handlers.
///
/// Cloneable and extracted in handlers with `State<AppState>`. All shared
/// services are constructed here explicitly; there are no process-global
/// instances, so tests build isolated states per case.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    auth_config: Arc<AuthConfig>,
    ingestion: Arc<IngestionService>,
    sessions: SessionRegistry,
    events: Arc<EventQueue>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: ServerConfig, auth_config: AuthConfig) -> Self {
        let events = Arc::new(EventQueue::with_capacity(config.max_events));
        Self {
            config: Arc::new(config),
            auth_config: Arc::new(auth_config),
            ingestion: Arc::new(IngestionService::new()),
            sessions: SessionRegistry::new(),
            events,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Authentication configuration snapshot (for metadata reporting).
    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth_config
    }

    /// Ingestion service.
    pub fn ingestion(&self) -> &Arc<IngestionService> {
        &self.ingestion
    }

    /// Session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Event queue.
    pub fn events(&self) -> &Arc<EventQueue> {
        &self.events
    }

    /// Protocol handler wired to this state's services, one per session.
    pub fn protocol_handler(&self) -> ProtocolHandler {
        ProtocolHandler::new(self.ingestion.clone(), self.events.clone())
    }

    /// Drain sessions and subscribers at shutdown.
    pub async fn drain(&self) {
        self.sessions.clear().await;
        self.events.clear().await;
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

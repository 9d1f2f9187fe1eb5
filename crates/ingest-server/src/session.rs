//! Session-scoped connection registry.
//!
//! Multiplexes logical long-lived protocol sessions over stateless
//! request/response transport. Each session id maps to exactly one live
//! transport: a spawned task that owns a [`ProtocolHandler`] and processes
//! requests from an `mpsc` channel strictly in order, so concurrent requests
//! bearing the same session id serialize at the transport while the registry
//! stays safe for concurrent requests across session ids.
//!
//! Closure is driven by the transport, not the registry: when the transport
//! task finishes (shutdown request or channel teardown) it removes its own
//! registry entry. The registry never creates a session for an unrecognized
//! id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot};
use uuid::Uuid;

use crate::protocol::{ProtocolHandler, RpcRequest, RpcResponse};

/// Per-session request channel depth. Requests beyond this apply
/// backpressure to callers.
const SESSION_CHANNEL_CAPACITY: usize = 32;

/// Errors surfaced by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The transport went away mid-request.
    #[error("session closed")]
    Closed,
}

struct SessionMessage {
    request: RpcRequest,
    reply: oneshot::Sender<RpcResponse>,
}

/// Client handle to one live session transport.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    tx: mpsc::Sender<SessionMessage>,
}

impl SessionHandle {
    /// The session's opaque identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Route one request through the transport and await its response.
    ///
    /// Requests for the same session are answered in submission order.
    pub async fn request(&self, request: RpcRequest) -> Result<RpcResponse, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionMessage {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}

type SessionMap = Arc<RwLock<HashMap<String, SessionHandle>>>;

/// Maps opaque session ids to live transports.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: SessionMap,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session around `handler` and return its handle.
    ///
    /// The generated id is registered before the handle is handed back, so a
    /// caller that round-trips the id immediately will find the session.
    pub async fn create(&self, handler: ProtocolHandler) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let handle = SessionHandle { id: id.clone(), tx };

        self.sessions
            .write()
            .await
            .insert(id.clone(), handle.clone());

        tokio::spawn(run_transport(
            id.clone(),
            rx,
            handler,
            self.sessions.clone(),
        ));

        tracing::info!(session_id = %id, "session created");
        handle
    }

    /// Look up an existing session. Never creates one.
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Number of active sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session handle, letting the transports drain and tear
    /// themselves down. Used at shutdown.
    pub async fn clear(&self) {
        let mut sessions = self.sessions.write().await;
        let drained = sessions.len();
        sessions.clear();
        if drained > 0 {
            tracing::info!(sessions = drained, "session registry cleared");
        }
    }
}

/// Transport task: owns request ordering for one session.
///
/// Exits when the handler signals closure or every sender is gone, then
/// removes its own registry entry.
async fn run_transport(
    id: String,
    mut rx: mpsc::Receiver<SessionMessage>,
    handler: ProtocolHandler,
    sessions: SessionMap,
) {
    while let Some(message) = rx.recv().await {
        let handled = handler.handle(message.request).await;
        // A dropped reply receiver means the caller gave up; the session
        // itself stays healthy.
        let _ = message.reply.send(handled.response);
        if handled.close {
            break;
        }
    }

    sessions.write().await.remove(&id);
    tracing::info!(session_id = %id, "session closed");
}

//! Server-Sent Events endpoint for event streaming.
//!
//! On connect the subscriber receives the full current backlog, oldest
//! first, followed by live events as they occur. Each frame carries the
//! event name, the JSON payload, and the event's queue-assigned sequence id:
//!
//! ```text
//! event: ingest:result
//! data: {"id":"...","status":"completed",...}
//! id: 42
//! ```
//!
//! Client disconnects are edge-triggered: a watcher task unsubscribes the
//! sink as soon as the stream side is dropped, so the queue does not retain
//! dead subscribers until the next delivery attempt.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::{EventSink, QueueEvent, SinkError};
use crate::state::AppState;

/// Keep-alive comment interval for idle streams.
const KEEP_ALIVE_SECS: u64 = 30;

/// Channel-backed sink bridging the event queue to one SSE connection.
struct ChannelSink {
    tx: mpsc::UnboundedSender<QueueEvent>,
}

impl EventSink for ChannelSink {
    fn send(&self, event: &QueueEvent) -> Result<(), SinkError> {
        self.tx
            .send(event.clone())
            .map_err(|_| SinkError("sse client disconnected".to_string()))
    }

    fn close(&self) {
        // Dropping the sink drops the sender; the stream ends when the
        // receiver sees the channel close.
    }
}

/// GET /sse - Subscribe to the event stream.
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscriber_id = Uuid::new_v4().to_string();
    tracing::info!(subscriber_id = %subscriber_id, "sse connection requested");

    let (tx, rx) = mpsc::unbounded_channel();

    // Backlog replay happens inside subscribe, before any live event.
    state
        .events()
        .subscribe(subscriber_id.clone(), Box::new(ChannelSink { tx: tx.clone() }))
        .await;

    // Unsubscribe promptly when the client goes away.
    let events = state.events().clone();
    let watched_id = subscriber_id.clone();
    tokio::spawn(async move {
        tx.closed().await;
        tracing::info!(subscriber_id = %watched_id, "sse connection closed");
        events.unsubscribe(&watched_id).await;
    });

    let stream = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let data = serde_json::to_string(&event.data).unwrap_or_else(|_| "null".to_string());
        let frame = Event::default()
            .event(event.event)
            .data(data)
            .id(event.id);
        Some((Ok::<_, Infallible>(frame), rx))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

/// Build SSE routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sse", get(event_stream))
}

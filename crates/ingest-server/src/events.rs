//! Bounded event queue with multi-subscriber fan-out and backlog replay.
//!
//! The queue keeps a fixed-capacity, time-ordered buffer of recent events so
//! late-joining subscribers can catch up, and fans every new event out to all
//! current subscribers synchronously. One misbehaving subscriber never blocks
//! or fails delivery to the others: failed sends are collected during the
//! fan-out pass and the offenders are unsubscribed only after the pass
//! completes.
//!
//! Subscribers are anything implementing [`EventSink`]; the SSE route
//! supplies a channel-backed sink whose receiving side feeds the HTTP stream.

use std::collections::VecDeque;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// Default backlog capacity.
pub const DEFAULT_MAX_EVENTS: usize = 100;

/// One queued event. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEvent {
    /// Event name (e.g. "ingest:result").
    pub event: String,
    /// Arbitrary JSON payload.
    pub data: Value,
    /// Milliseconds since the Unix epoch at creation time.
    pub timestamp: i64,
    /// Process-lifetime monotonic id, stringified. Never reused, even after
    /// the event is evicted from the backlog.
    pub id: String,
}

/// Failure reported by a subscriber's `send`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("subscriber send failed: {0}")]
pub struct SinkError(pub String);

/// A live delivery target owned by the queue for the duration of its
/// subscription.
pub trait EventSink: Send + Sync {
    /// Deliver one event. An `Err` marks this subscriber dead: the queue
    /// closes and removes it after the current fan-out pass.
    fn send(&self, event: &QueueEvent) -> Result<(), SinkError>;

    /// Release the subscriber's resources. Must not fail; called at most
    /// once per removal but implementations should tolerate repeats.
    fn close(&self);
}

/// Point-in-time queue statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQueueStats {
    pub event_count: usize,
    pub subscriber_count: usize,
    pub max_events: usize,
}

struct Subscriber {
    id: String,
    sink: Box<dyn EventSink>,
}

struct Inner {
    /// Ordered backlog, oldest first. FIFO-evicted beyond `max_events`.
    events: VecDeque<QueueEvent>,
    /// Subscribers in registration order.
    subscribers: Vec<Subscriber>,
    max_events: usize,
    /// Monotonic id counter; first assigned id is 1.
    event_id_counter: u64,
}

/// Bounded, time-ordered event buffer with subscriber fan-out.
///
/// Explicitly constructed and owned by whatever builds the HTTP layer; no
/// global instance, so tests construct isolated queues per case.
pub struct EventQueue {
    inner: Mutex<Inner>,
}

impl EventQueue {
    /// Create a queue with the default backlog capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_EVENTS)
    }

    /// Create a queue retaining at most `max_events` events.
    #[must_use]
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: VecDeque::new(),
                subscribers: Vec::new(),
                max_events,
                event_id_counter: 0,
            }),
        }
    }

    /// Append a new event and fan it out to every current subscriber in
    /// registration order.
    ///
    /// The event gets the next monotonic id and the current timestamp, the
    /// oldest event is evicted if the backlog exceeds capacity, and
    /// subscribers whose `send` fails are closed and removed after the full
    /// fan-out pass. Returns the stored event.
    pub async fn push_event(&self, event: impl Into<String>, data: Value) -> QueueEvent {
        let mut inner = self.inner.lock().await;

        inner.event_id_counter += 1;
        let full_event = QueueEvent {
            event: event.into(),
            data,
            timestamp: Utc::now().timestamp_millis(),
            id: inner.event_id_counter.to_string(),
        };

        inner.events.push_back(full_event.clone());
        while inner.events.len() > inner.max_events {
            inner.events.pop_front();
        }

        let mut dead: Vec<String> = Vec::new();
        for subscriber in &inner.subscribers {
            if let Err(error) = subscriber.sink.send(&full_event) {
                tracing::error!(%error, subscriber_id = %subscriber.id, "error sending event to subscriber");
                dead.push(subscriber.id.clone());
            }
        }
        for id in dead {
            remove_subscriber(&mut inner, &id);
        }

        tracing::debug!(event_id = %full_event.id, event = %full_event.event, "event pushed");
        full_event
    }

    /// Register a subscriber and immediately replay the full backlog to it,
    /// oldest first.
    ///
    /// Replay happens in the same critical section as registration, so the
    /// backlog and the subsequent live stream can never interleave out of
    /// order for this subscriber. Backlog send failures are logged but do not
    /// remove the fresh subscriber.
    pub async fn subscribe(&self, id: impl Into<String>, sink: Box<dyn EventSink>) {
        let id = id.into();
        let mut inner = self.inner.lock().await;

        for event in &inner.events {
            if let Err(error) = sink.send(event) {
                tracing::error!(%error, subscriber_id = %id, "error sending backlog event to subscriber");
            }
        }

        tracing::debug!(subscriber_id = %id, "subscriber added");
        inner.subscribers.push(Subscriber { id, sink });
    }

    /// Close and remove a subscriber. Idempotent.
    pub async fn unsubscribe(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        remove_subscriber(&mut inner, id);
    }

    /// Copy of the most recent events, oldest first. `limit` trims to the
    /// newest `limit` entries.
    pub async fn recent_events(&self, limit: Option<usize>) -> Vec<QueueEvent> {
        let inner = self.inner.lock().await;
        let skip = limit.map_or(0, |l| inner.events.len().saturating_sub(l));
        inner.events.iter().skip(skip).cloned().collect()
    }

    /// Point-in-time snapshot of queue statistics.
    pub async fn stats(&self) -> EventQueueStats {
        let inner = self.inner.lock().await;
        EventQueueStats {
            event_count: inner.events.len(),
            subscriber_count: inner.subscribers.len(),
            max_events: inner.max_events,
        }
    }

    /// Close every subscriber, empty the backlog, and reset the id counter.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        for subscriber in inner.subscribers.drain(..) {
            subscriber.sink.close();
            tracing::debug!(subscriber_id = %subscriber.id, "subscriber removed");
        }
        inner.events.clear();
        inner.event_id_counter = 0;
        tracing::info!("event queue cleared");
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_subscriber(inner: &mut Inner, id: &str) {
    if let Some(index) = inner.subscribers.iter().position(|s| s.id == id) {
        let subscriber = inner.subscribers.remove(index);
        subscriber.sink.close();
        tracing::debug!(subscriber_id = %id, "subscriber removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Sink recording every delivered event, optionally failing on demand.
    struct RecordingSink {
        received: Arc<StdMutex<Vec<QueueEvent>>>,
        closed: Arc<AtomicBool>,
        fail: Arc<AtomicBool>,
    }

    impl RecordingSink {
        fn new() -> (Self, Arc<StdMutex<Vec<QueueEvent>>>, Arc<AtomicBool>, Arc<AtomicBool>) {
            let received = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let fail = Arc::new(AtomicBool::new(false));
            (
                Self {
                    received: received.clone(),
                    closed: closed.clone(),
                    fail: fail.clone(),
                },
                received,
                closed,
                fail,
            )
        }
    }

    impl EventSink for RecordingSink {
        fn send(&self, event: &QueueEvent) -> Result<(), SinkError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SinkError("simulated failure".to_string()));
            }
            self.received.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let queue = EventQueue::new();
        let first = queue.push_event("a", json!(1)).await;
        let second = queue.push_event("b", json!(2)).await;
        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
    }

    #[tokio::test]
    async fn test_capacity_eviction_is_fifo_and_ids_not_reused() {
        let queue = EventQueue::with_capacity(3);
        for name in ["A", "B", "C", "D"] {
            queue.push_event(name, json!(name)).await;
        }

        let events = queue.recent_events(None).await;
        let names: Vec<&str> = events.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "D"]);

        // Ids strictly increasing, and A's id (1) never reappears.
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "4"]);

        let next = queue.push_event("E", json!(null)).await;
        assert_eq!(next.id, "5");
    }

    #[tokio::test]
    async fn test_recent_events_limit_keeps_newest() {
        let queue = EventQueue::new();
        for name in ["A", "B", "C"] {
            queue.push_event(name, json!(null)).await;
        }
        let newest_two = queue.recent_events(Some(2)).await;
        let names: Vec<&str> = newest_two.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_late_subscriber_receives_backlog_in_order_before_live() {
        let queue = EventQueue::new();
        queue.push_event("A", json!(null)).await;
        queue.push_event("B", json!(null)).await;

        let (sink, received, _, _) = RecordingSink::new();
        queue.subscribe("sub-1", Box::new(sink)).await;
        queue.push_event("C", json!(null)).await;

        let names: Vec<String> = received.lock().unwrap().iter().map(|e| e.event.clone()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_failing_subscriber_removed_without_disturbing_others() {
        let queue = EventQueue::new();

        let (bad, bad_received, bad_closed, bad_fail) = RecordingSink::new();
        let (good, good_received, _, _) = RecordingSink::new();
        queue.subscribe("bad", Box::new(bad)).await;
        queue.subscribe("good", Box::new(good)).await;

        bad_fail.store(true, Ordering::SeqCst);
        queue.push_event("C", json!(null)).await;
        queue.push_event("D", json!(null)).await;

        // Bad sink saw nothing after its failure and was closed.
        assert!(bad_received.lock().unwrap().is_empty());
        assert!(bad_closed.load(Ordering::SeqCst));

        // Good sink received both C and D.
        let names: Vec<String> =
            good_received.lock().unwrap().iter().map(|e| e.event.clone()).collect();
        assert_eq!(names, vec!["C", "D"]);

        assert_eq!(queue.stats().await.subscriber_count, 1);
    }

    #[tokio::test]
    async fn test_fan_out_continues_past_failure_in_registration_order() {
        // Failing subscriber registered first must not truncate delivery to
        // subscribers registered after it.
        let queue = EventQueue::new();
        let (first, _, _, first_fail) = RecordingSink::new();
        let (second, second_received, _, _) = RecordingSink::new();
        queue.subscribe("first", Box::new(first)).await;
        queue.subscribe("second", Box::new(second)).await;

        first_fail.store(true, Ordering::SeqCst);
        queue.push_event("X", json!(null)).await;
        assert_eq!(second_received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_closes() {
        let queue = EventQueue::new();
        let (sink, _, closed, _) = RecordingSink::new();
        queue.subscribe("sub", Box::new(sink)).await;

        queue.unsubscribe("sub").await;
        assert!(closed.load(Ordering::SeqCst));
        queue.unsubscribe("sub").await;
        queue.unsubscribe("never-existed").await;

        assert_eq!(queue.stats().await.subscriber_count, 0);
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let queue = EventQueue::with_capacity(5);
        queue.push_event("A", json!(null)).await;
        let (sink, _, _, _) = RecordingSink::new();
        queue.subscribe("sub", Box::new(sink)).await;

        let stats = queue.stats().await;
        assert_eq!(stats.event_count, 1);
        assert_eq!(stats.subscriber_count, 1);
        assert_eq!(stats.max_events, 5);
    }

    #[tokio::test]
    async fn test_clear_closes_subscribers_and_resets_counter() {
        let queue = EventQueue::new();
        queue.push_event("A", json!(null)).await;
        let (sink, _, closed, _) = RecordingSink::new();
        queue.subscribe("sub", Box::new(sink)).await;

        queue.clear().await;

        assert!(closed.load(Ordering::SeqCst));
        let stats = queue.stats().await;
        assert_eq!(stats.event_count, 0);
        assert_eq!(stats.subscriber_count, 0);

        // Counter reset: next event starts over at 1.
        let event = queue.push_event("B", json!(null)).await;
        assert_eq!(event.id, "1");
    }

    #[tokio::test]
    async fn test_concurrent_pushes_assign_unique_ids() {
        let queue = Arc::new(EventQueue::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    queue.push_event("e", json!(null)).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let events = queue.recent_events(None).await;
        assert_eq!(events.len(), 100);
        let mut ids: Vec<u64> = events.iter().map(|e| e.id.parse().unwrap()).collect();
        let unique = {
            let mut sorted = ids.clone();
            sorted.dedup();
            sorted.len()
        };
        ids.sort_unstable();
        assert_eq!(unique, 100);
        assert_eq!(*ids.last().unwrap(), 200);
    }

    #[tokio::test]
    async fn test_counter_visible_in_stats_after_eviction() {
        let queue = EventQueue::with_capacity(2);
        for _ in 0..5 {
            queue.push_event("e", json!(null)).await;
        }
        let stats = queue.stats().await;
        assert_eq!(stats.event_count, 2);
        assert_eq!(stats.max_events, 2);
    }

    #[tokio::test]
    async fn test_subscriber_count_tracks_failures() {
        let queue = EventQueue::new();
        let (sink, _, _, fail) = RecordingSink::new();
        queue.subscribe("flaky", Box::new(sink)).await;
        assert_eq!(queue.stats().await.subscriber_count, 1);

        fail.store(true, Ordering::SeqCst);
        queue.push_event("X", json!(null)).await;
        assert_eq!(queue.stats().await.subscriber_count, 0);
    }

    #[tokio::test]
    async fn test_send_count_matches_once_per_event() {
        // A subscriber present for an event's entire lifetime sees it exactly
        // once.
        struct CountingSink(Arc<AtomicUsize>);
        impl EventSink for CountingSink {
            fn send(&self, _: &QueueEvent) -> Result<(), SinkError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            fn close(&self) {}
        }

        let queue = EventQueue::new();
        let count = Arc::new(AtomicUsize::new(0));
        queue.subscribe("counter", Box::new(CountingSink(count.clone()))).await;
        for _ in 0..10 {
            queue.push_event("e", json!(null)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }
}

//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans [`AssessmentEvent`]s out to every subscriber. Share it
//! via `Arc<EventBus>` between the pipeline and its listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const EVENT_RUN_STARTED: &str = "run.started";
pub const EVENT_BATCH_PROGRESS: &str = "batch.progress";
pub const EVENT_AUTO_FIX_COMPLETED: &str = "autofix.completed";
pub const EVENT_ANALYSIS_COMPLETED: &str = "analysis.completed";
pub const EVENT_RUN_COMPLETED: &str = "run.completed";

// ---------------------------------------------------------------------------
// AssessmentEvent
// ---------------------------------------------------------------------------

/// Something that happened during an assessment run.
///
/// Built with [`AssessmentEvent::new`] and enriched with
/// [`with_run`](AssessmentEvent::with_run) and
/// [`with_payload`](AssessmentEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentEvent {
    /// Dot-separated event name, e.g. `"batch.progress"`.
    pub event_type: String,

    /// Run that emitted the event, when known.
    pub run_id: Option<Uuid>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl AssessmentEvent {
    /// Event with an empty object payload and no run id.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            run_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Progress of a chunked batch: `{stage, processed, total}`.
    pub fn batch_progress(stage: &str, processed: usize, total: usize) -> Self {
        Self::new(EVENT_BATCH_PROGRESS).with_payload(serde_json::json!({
            "stage": stage,
            "processed": processed,
            "total": total,
        }))
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use assessor_events::bus::{AssessmentEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(AssessmentEvent::batch_progress("validation", 100, 250));
/// ```
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<AssessmentEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Once the buffer is full the oldest unread events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody is
    /// listening.
    pub fn publish(&self, event: AssessmentEvent) {
        let event_type = event.event_type.clone();
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(%event_type, receivers, "Event published"),
            Err(_) => tracing::trace!(%event_type, "Event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssessmentEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let run_id = Uuid::now_v7();

        bus.publish(
            AssessmentEvent::new(EVENT_RUN_STARTED)
                .with_run(run_id)
                .with_payload(serde_json::json!({"recordCount": 3})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, EVENT_RUN_STARTED);
        assert_eq!(received.run_id, Some(run_id));
        assert_eq!(received.payload["recordCount"], 3);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(AssessmentEvent::batch_progress("validation", 2, 5));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.event_type, EVENT_BATCH_PROGRESS);
        assert_eq!(e2.payload["processed"], 2);
        assert_eq!(e2.payload["total"], 5);
        assert_eq!(e2.payload["stage"], "validation");
    }

    #[tokio::test]
    async fn slow_subscriber_observes_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for i in 0..4 {
            bus.publish(AssessmentEvent::batch_progress("validation", i, 4));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        let next = rx.recv().await.expect("buffered event");
        assert_eq!(next.payload["processed"], 2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(AssessmentEvent::new("orphan.event"));
    }

    #[test]
    fn new_event_has_empty_payload_and_no_run() {
        let event = AssessmentEvent::new("bare.event");
        assert!(event.run_id.is_none());
        assert!(event.payload.is_object());
    }
}

//! Event types for the ROAM pipeline event system

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Which interpretation path produced an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentMethodTag {
    Semantic,
    KeywordFallback,
}

/// Pipeline progress events
///
/// Broadcast by the recommender as a request moves through the pipeline.
/// Consumed by the `/events` SSE stream and by tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A recommendation request entered the pipeline
    RequestStarted {
        request_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Intent extraction finished (semantic or fallback)
    IntentResolved {
        request_id: Uuid,
        method: IntentMethodTag,
        confidence: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Candidate regions selected for fan-out
    RegionsSelected {
        request_id: Uuid,
        region_count: usize,
        willing_to_travel: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Venue verification finished across all regions
    VenuesVerified {
        request_id: Uuid,
        venue_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Final curation finished
    CurationCompleted {
        request_id: Uuid,
        used_fallback: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The request left the pipeline (success or degraded)
    RequestCompleted {
        request_id: Uuid,
        recommendation_count: usize,
        elapsed_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast event bus for pipeline progress
///
/// Thin wrapper over `tokio::sync::broadcast`. Subscribers receive events
/// emitted after subscription; slow subscribers lose oldest events when the
/// channel is full.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    ///
    /// Progress events are non-critical; nothing listening is fine.
    pub fn emit_lossy(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for pipeline event");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

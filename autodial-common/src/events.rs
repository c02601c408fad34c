//! Campaign lifecycle events
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Campaign lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DialerEvent {
    /// A submission was accepted and dialing began
    CampaignStarted {
        campaign_id: Uuid,
        total: usize,
        voice_preference: bool,
        timestamp: DateTime<Utc>,
    },

    /// An attempt moved from Queued to Dialing
    AttemptStarted {
        campaign_id: Uuid,
        /// Zero-based position in dial order
        position: usize,
        number: String,
        timestamp: DateTime<Utc>,
    },

    /// An attempt reached a terminal state
    AttemptFinished {
        campaign_id: Uuid,
        position: usize,
        number: String,
        connected: bool,
        /// Failure reason, or the transport's connect detail
        detail: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// The queue drained
    CampaignCompleted {
        campaign_id: Uuid,
        connected: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// An operator cancelled the running campaign
    CampaignCancelled {
        campaign_id: Uuid,
        /// Queued attempts marked failed by the cancellation
        cancelled: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DialerEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            DialerEvent::CampaignStarted { .. } => "CampaignStarted",
            DialerEvent::AttemptStarted { .. } => "AttemptStarted",
            DialerEvent::AttemptFinished { .. } => "AttemptFinished",
            DialerEvent::CampaignCompleted { .. } => "CampaignCompleted",
            DialerEvent::CampaignCancelled { .. } => "CampaignCancelled",
        }
    }

    pub fn campaign_id(&self) -> Uuid {
        match self {
            DialerEvent::CampaignStarted { campaign_id, .. }
            | DialerEvent::AttemptStarted { campaign_id, .. }
            | DialerEvent::AttemptFinished { campaign_id, .. }
            | DialerEvent::CampaignCompleted { campaign_id, .. }
            | DialerEvent::CampaignCancelled { campaign_id, .. } => *campaign_id,
        }
    }
}

/// Broadcast bus for [`DialerEvent`]s
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DialerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DialerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DialerEvent,
    ) -> Result<usize, broadcast::error::SendError<DialerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DialerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

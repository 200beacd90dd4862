//! Engine lifecycle events and the pub/sub bus.
//!
//! Every significant transition publishes an [`EngineEvent`] on a Tokio
//! broadcast channel. Publishing never fails the state machine: with no
//! subscribers the event is simply dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::{ActionId, ActionKind, EventId, EventKind, RiskTier, Severity};

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to the engine event bus.
pub type SharedEventBus = Arc<EventBus>;

/// All engine lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new incident event was ingested.
    EventReported {
        event_id: EventId,
        kind: EventKind,
        severity: Severity,
        timestamp: DateTime<Utc>,
    },

    /// A diagnosis was attached to an event.
    DiagnosisRecorded {
        event_id: EventId,
        risk_tier: RiskTier,
        confidence: f64,
        /// Whether the fail-safe default replaced a failed provider call.
        fallback: bool,
        timestamp: DateTime<Utc>,
    },

    /// A suggested action was synthesized for an event.
    ActionProposed {
        event_id: EventId,
        action_id: ActionId,
        kind: ActionKind,
        timestamp: DateTime<Utc>,
    },

    /// The action was enqueued for operator approval.
    ApprovalRequested {
        event_id: EventId,
        action_id: ActionId,
        risk_tier: RiskTier,
        timestamp: DateTime<Utc>,
    },

    /// Remediation started (automatically or after approval).
    ExecutionStarted {
        event_id: EventId,
        action_id: ActionId,
        auto: bool,
        timestamp: DateTime<Utc>,
    },

    /// An operator approved the pending action.
    ActionApproved {
        event_id: EventId,
        action_id: ActionId,
        timestamp: DateTime<Utc>,
    },

    /// An operator rejected the pending action.
    ActionRejected {
        event_id: EventId,
        action_id: ActionId,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Execution completed and the event resolved.
    EventResolved {
        event_id: EventId,
        action_id: ActionId,
        duration_ms: u64,
        verification_passed: bool,
        timestamp: DateTime<Utc>,
    },

    /// The event reached the failed terminal state.
    EventFailed {
        event_id: EventId,
        action_id: Option<ActionId>,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An operator escalated the event out of automated handling.
    EventEscalated {
        event_id: EventId,
        new_tier: RiskTier,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Get the timestamp of this event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::EventReported { timestamp, .. } => *timestamp,
            Self::DiagnosisRecorded { timestamp, .. } => *timestamp,
            Self::ActionProposed { timestamp, .. } => *timestamp,
            Self::ApprovalRequested { timestamp, .. } => *timestamp,
            Self::ExecutionStarted { timestamp, .. } => *timestamp,
            Self::ActionApproved { timestamp, .. } => *timestamp,
            Self::ActionRejected { timestamp, .. } => *timestamp,
            Self::EventResolved { timestamp, .. } => *timestamp,
            Self::EventFailed { timestamp, .. } => *timestamp,
            Self::EventEscalated { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EventReported { .. } => "event_reported",
            Self::DiagnosisRecorded { .. } => "diagnosis_recorded",
            Self::ActionProposed { .. } => "action_proposed",
            Self::ApprovalRequested { .. } => "approval_requested",
            Self::ExecutionStarted { .. } => "execution_started",
            Self::ActionApproved { .. } => "action_approved",
            Self::ActionRejected { .. } => "action_rejected",
            Self::EventResolved { .. } => "event_resolved",
            Self::EventFailed { .. } => "event_failed",
            Self::EventEscalated { .. } => "event_escalated",
        }
    }

    /// The incident event this engine event concerns.
    pub fn event_id(&self) -> &str {
        match self {
            Self::EventReported { event_id, .. } => event_id,
            Self::DiagnosisRecorded { event_id, .. } => event_id,
            Self::ActionProposed { event_id, .. } => event_id,
            Self::ApprovalRequested { event_id, .. } => event_id,
            Self::ExecutionStarted { event_id, .. } => event_id,
            Self::ActionApproved { event_id, .. } => event_id,
            Self::ActionRejected { event_id, .. } => event_id,
            Self::EventResolved { event_id, .. } => event_id,
            Self::EventFailed { event_id, .. } => event_id,
            Self::EventEscalated { event_id, .. } => event_id,
        }
    }
}

/// Broadcast bus for engine events.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus.
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers. No receivers is not an error.
    pub fn publish(&self, event: EngineEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "engine event published"),
            Err(_) => debug!(event_type, "engine event published (no receivers)"),
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(EngineEvent::EventReported {
            event_id: "evt-1".to_string(),
            kind: EventKind::Resource,
            severity: Severity::High,
            timestamp: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "event_reported");
        assert_eq!(received.event_id(), "evt-1");
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(EngineEvent::EventEscalated {
            event_id: "evt-2".to_string(),
            new_tier: RiskTier::High,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = EngineEvent::ApprovalRequested {
            event_id: "evt-3".to_string(),
            action_id: "act-1".to_string(),
            risk_tier: RiskTier::High,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"approval_requested\""));
        assert!(json.contains("\"risk_tier\":3"));

        let parsed: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "approval_requested");
    }
}

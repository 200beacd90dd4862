//! Event registry: the single shared mutable resource of the engine.
//!
//! The registry is injected as a trait so a durable backing store can be
//! substituted without touching lifecycle logic. Per-event mutual exclusion
//! is an explicit contract of the interface: every mutating operation is a
//! guarded read-modify-write against the event's current status, so two
//! concurrent writers can never both apply a transition from a stale status.

mod memory;

pub use memory::MemoryRegistry;

use crate::model::{
    ActionId, ActionStatus, Diagnosis, EventId, EventStatus, IncidentEvent, Resolution, RiskTier,
    SuggestedAction,
};

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error("action not found: {0}")]
    ActionNotFound(ActionId),

    #[error("event {id} is {actual}, cannot transition to {attempted}")]
    StatusConflict {
        id: EventId,
        actual: EventStatus,
        attempted: EventStatus,
    },

    #[error("action {id} is {actual}, cannot mark executing")]
    ActionStatusConflict { id: ActionId, actual: ActionStatus },

    #[error("resolution already recorded for event {0}")]
    ResolutionExists(EventId),

    #[error("event {0} has no diagnosis")]
    MissingDiagnosis(EventId),

    #[error("registry lock poisoned")]
    LockPoisoned,
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Keyed store of incident events with guarded state transitions.
///
/// Read operations return cloned snapshots; eventual consistency with
/// in-flight writes is acceptable for listings and statistics.
pub trait EventRegistry: Send + Sync {
    /// Store a freshly reported event.
    fn insert(&self, event: IncidentEvent) -> RegistryResult<()>;

    /// Snapshot of a single event.
    fn get(&self, id: &str) -> RegistryResult<IncidentEvent>;

    /// Snapshot of the event owning the given action.
    fn find_by_action(&self, action_id: &str) -> RegistryResult<IncidentEvent>;

    /// Events ordered by timestamp descending, optionally filtered by
    /// status, bounded by `limit`.
    fn list(&self, status: Option<EventStatus>, limit: usize) -> RegistryResult<Vec<IncidentEvent>>;

    /// Total number of events ever reported.
    fn count(&self) -> RegistryResult<usize>;

    /// Number of events currently in the given status.
    fn count_by_status(&self, status: EventStatus) -> RegistryResult<usize>;

    /// Snapshot of every event, for on-demand statistics.
    fn snapshot(&self) -> RegistryResult<Vec<IncidentEvent>>;

    /// `detected → diagnosing`, immediately after ingestion.
    fn begin_diagnosis(&self, id: &str) -> RegistryResult<()>;

    /// Attach the diagnosis and its synthesized action. Requires
    /// `diagnosing`; a superseding action replaces any live one.
    fn record_diagnosis(
        &self,
        id: &str,
        diagnosis: Diagnosis,
        action: SuggestedAction,
    ) -> RegistryResult<()>;

    /// `diagnosing → executing` on the auto-execute policy path; the action
    /// goes straight to `executing`.
    fn start_auto_execution(&self, id: &str) -> RegistryResult<IncidentEvent>;

    /// `diagnosing → pending_approval`; the action stays `pending`.
    fn queue_for_approval(&self, id: &str) -> RegistryResult<IncidentEvent>;

    /// `pending_approval → executing` triggered by an operator approval;
    /// the action becomes `approved`. Fails with
    /// [`RegistryError::StatusConflict`] if the event has already left
    /// `pending_approval`.
    fn approve_action(&self, action_id: &str) -> RegistryResult<IncidentEvent>;

    /// Flip an approved action to `executing` when the actuator task starts.
    /// Idempotent if the action is already executing.
    fn mark_action_executing(&self, action_id: &str) -> RegistryResult<()>;

    /// `pending_approval → failed` triggered by an operator rejection; the
    /// action becomes `rejected` and the rejection resolution is attached.
    fn reject_action(
        &self,
        action_id: &str,
        resolution: Resolution,
    ) -> RegistryResult<IncidentEvent>;

    /// Completion callback target: applies `executing → resolved|failed`
    /// and writes the resolution, only if the event is still `executing`.
    /// A stale completion yields [`RegistryError::StatusConflict`], which the
    /// caller treats as a logged no-op.
    fn complete_execution(
        &self,
        id: &str,
        resolution: Resolution,
        success: bool,
    ) -> RegistryResult<EventStatus>;

    /// Manual operator escalation from any non-terminal state: raises the
    /// diagnosis tier by one (capped at 3) and marks the event `escalated`.
    fn escalate(&self, id: &str) -> RegistryResult<(IncidentEvent, RiskTier)>;
}

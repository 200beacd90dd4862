//! Tiered-autonomy incident response engine.
//!
//! This library ingests operational events (errors, resource pressure,
//! performance regressions, security anomalies), produces an automated
//! diagnosis with a risk tier, and decides per-tier whether to remediate
//! immediately, remediate after notifying operators, or block on explicit
//! human approval. Every event is tracked through a bounded lifecycle to a
//! terminal resolution.
//!
//! # Components
//!
//! - [`registry`]: keyed store of incident events with per-event guarded
//!   state transitions (injected as a trait; in-memory implementation
//!   provided).
//! - [`diagnosis`]: pluggable diagnosis provider contract with a fail-safe
//!   tier-3 default and a built-in rule-based provider.
//! - [`synthesizer`]: turns a diagnosis into a concrete suggested action.
//! - [`policy`]: per-tier configuration and the auto-execute vs.
//!   require-approval decision.
//! - [`executor`]: pluggable actuator contract and the execution controller
//!   with its state-checked completion callback.
//! - [`stats`]: on-demand statistics over a registry snapshot.
//! - [`events`] / [`notify`]: lifecycle event bus and fire-and-forget
//!   operator notifications.
//! - [`engine`]: the façade wiring it all together.

pub mod diagnosis;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod policy;
pub mod registry;
pub mod stats;
pub mod synthesizer;

// Re-export key model types
pub use model::{
    ActionId, ActionKind, ActionStatus, Diagnosis, EventId, EventKind, EventStatus, IncidentEvent,
    Resolution, ResolutionStatus, RiskTier, Severity, SuggestedAction,
};

// Re-export the engine façade
pub use engine::{
    EventListing, ReportOutcome, ReportedEvent, ResponseEngine, SharedResponseEngine,
};

// Re-export error types
pub use error::{EngineError, EngineResult};

// Re-export component contracts
pub use diagnosis::{fallback_diagnosis, DiagnosisError, DiagnosisProvider, HeuristicProvider};
pub use executor::{
    ActuationReport, Actuator, ActuatorError, ExecutionContext, ExecutionController,
    SimulatedActuator,
};
pub use notify::{
    Notification, NotificationPhase, NotificationSink, TracingNotifier, WebhookNotifier,
};
pub use policy::{PolicyDecision, PolicyError, TierConfig, TierPolicy};
pub use registry::{EventRegistry, MemoryRegistry, RegistryError, RegistryResult};

// Re-export event bus and statistics types
pub use events::{EngineEvent, EventBus, SharedEventBus};
pub use stats::{EngineStats, StatusBreakdown, TierBreakdown};

//! Core data model for incident events and their remediation records.
//!
//! An [`IncidentEvent`] owns at most one [`Diagnosis`], at most one live
//! [`SuggestedAction`] and at most one [`Resolution`]. Events are never
//! deleted; they are retained for audit and statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for incident events.
pub type EventId = String;

/// Unique identifier for suggested actions.
pub type ActionId = String;

/// Category of a detected incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Error,
    Performance,
    Resource,
    Availability,
    Security,
    Configuration,
    Dependency,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Performance => write!(f, "performance"),
            Self::Resource => write!(f, "resource"),
            Self::Availability => write!(f, "availability"),
            Self::Security => write!(f, "security"),
            Self::Configuration => write!(f, "configuration"),
            Self::Dependency => write!(f, "dependency"),
        }
    }
}

/// Reported severity. Informational only: severity never drives tiering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Lifecycle status of an incident event.
///
/// Legal transitions are encoded in [`crate::lifecycle`]; `resolved`,
/// `failed` and `escalated` are terminal for this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Detected,
    Diagnosing,
    PendingApproval,
    Executing,
    Resolved,
    Failed,
    Escalated,
}

impl EventStatus {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed | Self::Escalated)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detected => write!(f, "detected"),
            Self::Diagnosing => write!(f, "diagnosing"),
            Self::PendingApproval => write!(f, "pending_approval"),
            Self::Executing => write!(f, "executing"),
            Self::Resolved => write!(f, "resolved"),
            Self::Failed => write!(f, "failed"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

/// Risk classification controlling how remediation is dispatched.
///
/// Serialized as the plain tier number (1, 2 or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RiskTier {
    /// Tier 1 — low risk, eligible for automatic remediation.
    Low,
    /// Tier 2 — medium risk, approval-gated under default policy.
    Moderate,
    /// Tier 3 — high risk, always requires human verification.
    High,
}

impl RiskTier {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Moderate => 2,
            Self::High => 3,
        }
    }

    /// The next tier up, saturating at tier 3.
    pub fn escalated(self) -> Self {
        match self {
            Self::Low => Self::Moderate,
            Self::Moderate | Self::High => Self::High,
        }
    }
}

impl TryFrom<u8> for RiskTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Moderate),
            3 => Ok(Self::High),
            other => Err(format!("risk tier out of range: {other}")),
        }
    }
}

impl From<RiskTier> for u8 {
    fn from(tier: RiskTier) -> Self {
        tier.as_u8()
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Automated diagnosis attached to an event.
///
/// Immutable after attachment, except that `risk_tier` may be raised by an
/// explicit escalation. It never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Provider confidence in the root cause, 0.0–1.0.
    pub confidence: f64,
    /// Inferred root cause.
    pub root_cause: String,
    /// Provider reasoning for the diagnosis.
    pub reasoning: String,
    /// Risk classification driving the tier policy fork.
    pub risk_tier: RiskTier,
    /// Remediation candidates, most-preferred first.
    pub recommended_actions: Vec<ActionKind>,
}

impl Diagnosis {
    pub fn new(
        confidence: f64,
        root_cause: impl Into<String>,
        reasoning: impl Into<String>,
        risk_tier: RiskTier,
        recommended_actions: Vec<ActionKind>,
    ) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            root_cause: root_cause.into(),
            reasoning: reasoning.into(),
            risk_tier,
            recommended_actions,
        }
    }

    /// Raise the tier by one, capped at tier 3. Returns the new tier.
    pub fn escalate_tier(&mut self) -> RiskTier {
        self.risk_tier = self.risk_tier.escalated();
        self.risk_tier
    }
}

/// Closed set of remediation action kinds.
///
/// Each variant carries its static metadata, replacing stringly-typed
/// description lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RestartService,
    ScaleOut,
    ClearCache,
    RollbackDeployment,
    ReloadConfiguration,
    RotateCredentials,
    IsolateHost,
    FailoverDependency,
    NotifyTeam,
}

impl ActionKind {
    /// Human-readable description of what the action does.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RestartService => "Restart the affected service process",
            Self::ScaleOut => "Add capacity to the affected resource pool",
            Self::ClearCache => "Flush caches serving the affected workload",
            Self::RollbackDeployment => "Roll back to the last known-good deployment",
            Self::ReloadConfiguration => "Reload configuration from the last validated source",
            Self::RotateCredentials => "Rotate credentials for the affected principals",
            Self::IsolateHost => "Isolate the affected host from the network",
            Self::FailoverDependency => "Fail over to the standby for the affected dependency",
            Self::NotifyTeam => "Notify the on-call team for manual investigation",
        }
    }

    /// Rollback plan text for this action kind.
    pub fn rollback_plan(&self) -> &'static str {
        match self {
            Self::RestartService => "Previous process state is not recoverable; monitor and re-restart on regression",
            Self::ScaleOut => "Scale the resource pool back to its previous capacity",
            Self::ClearCache => "Caches repopulate on demand; no explicit rollback required",
            Self::RollbackDeployment => "Re-deploy the rolled-back version from the release pipeline",
            Self::ReloadConfiguration => "Restore the prior configuration snapshot and reload",
            Self::RotateCredentials => "Re-issue the previous credential set from the secret store backup",
            Self::IsolateHost => "Rejoin the host to the network after verification",
            Self::FailoverDependency => "Fail back to the primary once it reports healthy",
            Self::NotifyTeam => "No automated change is made; nothing to roll back",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RestartService => write!(f, "restart_service"),
            Self::ScaleOut => write!(f, "scale_out"),
            Self::ClearCache => write!(f, "clear_cache"),
            Self::RollbackDeployment => write!(f, "rollback_deployment"),
            Self::ReloadConfiguration => write!(f, "reload_configuration"),
            Self::RotateCredentials => write!(f, "rotate_credentials"),
            Self::IsolateHost => write!(f, "isolate_host"),
            Self::FailoverDependency => write!(f, "failover_dependency"),
            Self::NotifyTeam => write!(f, "notify_team"),
        }
    }
}

/// Status of a suggested action through the approval/execution flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Approved,
    Executing,
    Completed,
    Failed,
    Rejected,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Concrete remediation proposal derived from a diagnosis.
///
/// Exactly one live action per event; a superseding action replaces the
/// previous one rather than accumulating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub id: ActionId,
    pub event_id: EventId,
    pub kind: ActionKind,
    /// Copied from the diagnosis at creation time.
    pub risk_tier: RiskTier,
    pub description: String,
    pub estimated_impact: String,
    /// Populated only for tier >= 2; tier-1 actions are trivially reversible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_plan: Option<String>,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
}

/// Outcome of executing (or rejecting) a suggested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Success,
    Partial,
    Failed,
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal record of what happened when an action ran.
///
/// Written exactly once per event; immutable after write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub action_id: ActionId,
    pub status: ResolutionStatus,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    /// Did the post-execution health check confirm the fix.
    pub verification_passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Resolution {
    /// Resolution synthesized when an operator rejects a pending action.
    pub fn rejection(action_id: ActionId, reason: Option<String>) -> Self {
        Self {
            action_id,
            status: ResolutionStatus::Failed,
            timestamp: Utc::now(),
            duration_ms: 0,
            verification_passed: false,
            output: None,
            notes: reason,
        }
    }
}

/// One detected incident tracked through its full lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub id: EventId,
    /// Creation time; listing order is newest first.
    pub timestamp: DateTime<Utc>,
    /// Last mutation time, maintained by the registry.
    pub updated_at: DateTime<Utc>,
    /// Free-text origin identifier.
    pub source: String,
    pub kind: EventKind,
    pub severity: Severity,
    pub status: EventStatus,
    pub description: String,
    /// Opaque structured payload for diagnostic context.
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<SuggestedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl IncidentEvent {
    pub fn new(
        source: impl Into<String>,
        kind: EventKind,
        severity: Severity,
        description: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: now,
            updated_at: now,
            source: source.into(),
            kind,
            severity,
            status: EventStatus::Detected,
            description: description.into(),
            details,
            diagnosis: None,
            action: None,
            resolution: None,
        }
    }

    /// Risk tier from the attached diagnosis, if any.
    pub fn risk_tier(&self) -> Option<RiskTier> {
        self.diagnosis.as_ref().map(|d| d.risk_tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_escalation_is_monotonic_and_capped() {
        assert_eq!(RiskTier::Low.escalated(), RiskTier::Moderate);
        assert_eq!(RiskTier::Moderate.escalated(), RiskTier::High);
        assert_eq!(RiskTier::High.escalated(), RiskTier::High);

        let mut diagnosis = Diagnosis::new(0.9, "cause", "reasoning", RiskTier::Low, vec![]);
        assert_eq!(diagnosis.escalate_tier(), RiskTier::Moderate);
        assert_eq!(diagnosis.escalate_tier(), RiskTier::High);
        assert_eq!(diagnosis.escalate_tier(), RiskTier::High);
    }

    #[test]
    fn test_tier_serializes_as_number() {
        let json = serde_json::to_string(&RiskTier::Moderate).unwrap();
        assert_eq!(json, "2");

        let tier: RiskTier = serde_json::from_str("3").unwrap();
        assert_eq!(tier, RiskTier::High);

        assert!(serde_json::from_str::<RiskTier>("0").is_err());
        assert!(serde_json::from_str::<RiskTier>("4").is_err());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let diagnosis = Diagnosis::new(1.7, "cause", "reasoning", RiskTier::Low, vec![]);
        assert_eq!(diagnosis.confidence, 1.0);

        let diagnosis = Diagnosis::new(-0.3, "cause", "reasoning", RiskTier::Low, vec![]);
        assert_eq!(diagnosis.confidence, 0.0);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(EventStatus::Resolved.is_terminal());
        assert!(EventStatus::Failed.is_terminal());
        assert!(EventStatus::Escalated.is_terminal());
        assert!(!EventStatus::Detected.is_terminal());
        assert!(!EventStatus::PendingApproval.is_terminal());
        assert!(!EventStatus::Executing.is_terminal());
    }

    #[test]
    fn test_action_kind_metadata() {
        assert!(ActionKind::RestartService.description().contains("Restart"));
        assert!(!ActionKind::NotifyTeam.rollback_plan().is_empty());
        assert_eq!(ActionKind::ScaleOut.to_string(), "scale_out");
    }

    #[test]
    fn test_rejection_resolution_shape() {
        let resolution = Resolution::rejection("action-1".to_string(), Some("false positive".to_string()));
        assert_eq!(resolution.status, ResolutionStatus::Failed);
        assert!(!resolution.verification_passed);
        assert_eq!(resolution.duration_ms, 0);
        assert_eq!(resolution.notes.as_deref(), Some("false positive"));
    }

    #[test]
    fn test_new_event_starts_detected() {
        let event = IncidentEvent::new(
            "monitor-a",
            EventKind::Resource,
            Severity::High,
            "memory pressure on node-3",
            serde_json::json!({ "rss_bytes": 17_179_869_184u64 }),
        );
        assert_eq!(event.status, EventStatus::Detected);
        assert!(event.diagnosis.is_none());
        assert!(event.action.is_none());
        assert!(event.resolution.is_none());
        assert_eq!(event.timestamp, event.updated_at);
    }

    #[test]
    fn test_status_serde_round_trip() {
        let json = serde_json::to_string(&EventStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"pending_approval\"");
        let status: EventStatus = serde_json::from_str("\"escalated\"").unwrap();
        assert_eq!(status, EventStatus::Escalated);
    }
}

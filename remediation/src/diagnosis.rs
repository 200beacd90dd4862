//! Diagnosis provider contract and the built-in rule-based provider.
//!
//! The provider is pluggable: an ML- or LLM-backed implementation lives
//! outside this crate and only has to satisfy [`DiagnosisProvider`]. The
//! engine recovers from any provider failure by substituting the fail-safe
//! default diagnosis, so a mis-diagnosed or unrecognized event can never
//! auto-execute.

use async_trait::async_trait;

use crate::model::{ActionKind, Diagnosis, IncidentEvent, RiskTier};

/// Error type for diagnosis providers.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    #[error("diagnosis provider unavailable: {0}")]
    Unavailable(String),

    #[error("event kind not recognized by this provider")]
    Unrecognized,
}

/// Produces a diagnosis for a raw event.
///
/// Implementations may be probabilistic (confidence < 1.0) and may be slow
/// or fail; failures are recovered locally by the engine and never surfaced
/// to the reporting caller.
#[async_trait]
pub trait DiagnosisProvider: Send + Sync {
    async fn diagnose(&self, event: &IncidentEvent) -> Result<Diagnosis, DiagnosisError>;
}

/// Conservative default substituted when the provider fails.
///
/// Tier 3 with a lone `notify_team` candidate guarantees the event lands in
/// the approval queue under any sane policy.
pub fn fallback_diagnosis() -> Diagnosis {
    Diagnosis::new(
        0.1,
        "unknown",
        "Diagnosis provider unavailable; conservative default applied",
        RiskTier::High,
        vec![ActionKind::NotifyTeam],
    )
}

/// Deterministic rule-based provider keyed on the event kind.
///
/// This is the built-in default used by the server binary and the test
/// scenarios; production deployments substitute their own provider.
#[derive(Debug, Default, Clone)]
pub struct HeuristicProvider;

impl HeuristicProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiagnosisProvider for HeuristicProvider {
    async fn diagnose(&self, event: &IncidentEvent) -> Result<Diagnosis, DiagnosisError> {
        use crate::model::EventKind::*;

        let (confidence, root_cause, tier, actions) = match event.kind {
            Resource => (
                0.9,
                "resource saturation on the reporting host",
                RiskTier::Low,
                vec![ActionKind::ScaleOut, ActionKind::ClearCache],
            ),
            Performance => (
                0.75,
                "latency regression in the reporting service",
                RiskTier::Low,
                vec![ActionKind::ClearCache, ActionKind::RestartService],
            ),
            Error => (
                0.7,
                "elevated error rate after a recent change",
                RiskTier::Moderate,
                vec![ActionKind::RollbackDeployment, ActionKind::RestartService],
            ),
            Configuration => (
                0.8,
                "configuration drift from the validated baseline",
                RiskTier::Moderate,
                vec![ActionKind::ReloadConfiguration, ActionKind::RollbackDeployment],
            ),
            Availability => (
                0.7,
                "availability loss on a serving endpoint",
                RiskTier::Moderate,
                vec![ActionKind::FailoverDependency, ActionKind::RestartService],
            ),
            Dependency => (
                0.65,
                "degraded upstream dependency",
                RiskTier::Moderate,
                vec![ActionKind::FailoverDependency],
            ),
            Security => (
                0.6,
                "anomalous access pattern consistent with credential misuse",
                RiskTier::High,
                vec![ActionKind::IsolateHost, ActionKind::RotateCredentials],
            ),
        };

        Ok(Diagnosis::new(
            confidence,
            root_cause,
            format!(
                "Rule-based classification of {} event from {}",
                event.kind, event.source
            ),
            tier,
            actions,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, Severity};

    fn event(kind: EventKind, severity: Severity) -> IncidentEvent {
        IncidentEvent::new("monitor", kind, severity, "test", serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_heuristic_tiers() {
        let provider = HeuristicProvider::new();
        let cases = [
            (EventKind::Resource, RiskTier::Low),
            (EventKind::Performance, RiskTier::Low),
            (EventKind::Error, RiskTier::Moderate),
            (EventKind::Configuration, RiskTier::Moderate),
            (EventKind::Availability, RiskTier::Moderate),
            (EventKind::Dependency, RiskTier::Moderate),
            (EventKind::Security, RiskTier::High),
        ];

        for (kind, expected) in cases {
            let diagnosis = provider
                .diagnose(&event(kind, Severity::Medium))
                .await
                .unwrap();
            assert_eq!(diagnosis.risk_tier, expected, "kind {kind}");
            assert!(!diagnosis.recommended_actions.is_empty(), "kind {kind}");
        }
    }

    #[tokio::test]
    async fn test_severity_does_not_drive_tier() {
        let provider = HeuristicProvider::new();
        let low = provider
            .diagnose(&event(EventKind::Resource, Severity::Low))
            .await
            .unwrap();
        let critical = provider
            .diagnose(&event(EventKind::Resource, Severity::Critical))
            .await
            .unwrap();
        assert_eq!(low.risk_tier, critical.risk_tier);
    }

    #[test]
    fn test_fallback_is_conservative() {
        let fallback = fallback_diagnosis();
        assert_eq!(fallback.risk_tier, RiskTier::High);
        assert_eq!(fallback.root_cause, "unknown");
        assert!(fallback.confidence <= 0.2);
        assert_eq!(fallback.recommended_actions, vec![ActionKind::NotifyTeam]);
    }
}

//! End-to-end engine flows: the auto-execution path, the approval workflow,
//! rejection, and the statistics they leave behind.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use remediation::{
    ActionKind, ActuationReport, Actuator, ActuatorError, EventKind, EventStatus,
    ExecutionContext, HeuristicProvider, IncidentEvent, MemoryRegistry, ReportedEvent,
    ResponseEngine, RiskTier, Severity, SimulatedActuator, SuggestedAction, TierPolicy,
    TracingNotifier,
};

/// Actuator that runs fast except for isolation actions, which stay
/// in-flight long enough for assertions against the `executing` state.
struct SlowIsolationActuator;

#[async_trait]
impl Actuator for SlowIsolationActuator {
    async fn execute(
        &self,
        _event: &IncidentEvent,
        action: &SuggestedAction,
        _ctx: &ExecutionContext,
    ) -> Result<ActuationReport, ActuatorError> {
        let latency = match action.kind {
            ActionKind::IsolateHost => Duration::from_secs(30),
            _ => Duration::from_millis(10),
        };
        tokio::time::sleep(latency).await;
        Ok(ActuationReport::success(format!("ran {}", action.kind)))
    }
}

fn engine_with(actuator: Arc<dyn Actuator>) -> ResponseEngine {
    ResponseEngine::new(
        MemoryRegistry::new().shared(),
        Arc::new(HeuristicProvider::new()),
        actuator,
        Arc::new(TracingNotifier),
        TierPolicy::default(),
    )
}

fn default_engine() -> ResponseEngine {
    engine_with(Arc::new(SimulatedActuator::new(Duration::from_millis(10))))
}

fn report(kind: EventKind, severity: Severity, description: &str) -> ReportedEvent {
    ReportedEvent {
        source: "ops-monitor".to_string(),
        kind,
        severity,
        description: description.to_string(),
        details: serde_json::json!({ "host": "node-3" }),
    }
}

async fn wait_for_status(engine: &ResponseEngine, event_id: &str, status: EventStatus) {
    for _ in 0..200 {
        if engine.get(event_id).unwrap().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "event {event_id} never reached {status}, currently {}",
        engine.get(event_id).unwrap().status
    );
}

// Scenario A: a tier-1 resource event auto-executes and resolves on the
// actuator's success callback.
#[tokio::test]
async fn test_resource_event_auto_resolves() {
    let engine = default_engine();

    let outcome = engine
        .report(report(EventKind::Resource, Severity::High, "memory pressure"))
        .await
        .unwrap();
    assert!(outcome.auto_executed);
    assert_eq!(outcome.event.status, EventStatus::Executing);
    assert_eq!(outcome.event.risk_tier(), Some(RiskTier::Low));

    wait_for_status(&engine, &outcome.event.id, EventStatus::Resolved).await;

    let event = engine.get(&outcome.event.id).unwrap();
    let resolution = event.resolution.expect("resolved event has a resolution");
    assert!(resolution.verification_passed);
}

// Scenario B: a tier-3 security event waits for approval, shows up in the
// filtered listing, and approval moves it to executing.
#[tokio::test]
async fn test_security_event_requires_approval() {
    let engine = engine_with(Arc::new(SlowIsolationActuator));

    let outcome = engine
        .report(report(EventKind::Security, Severity::Critical, "anomalous access"))
        .await
        .unwrap();
    assert!(!outcome.auto_executed);
    assert_eq!(outcome.event.status, EventStatus::PendingApproval);
    assert_eq!(outcome.event.risk_tier(), Some(RiskTier::High));
    // No resolution may exist before an approval is observed.
    assert!(outcome.event.resolution.is_none());

    let listing = engine.list(Some(EventStatus::PendingApproval), 10).unwrap();
    assert!(listing.events.iter().any(|e| e.id == outcome.event.id));
    assert_eq!(listing.pending, 1);

    let action_id = outcome.event.action.unwrap().id;
    let event = engine.approve(&action_id).unwrap();
    assert_eq!(event.status, EventStatus::Executing);
}

// Scenario C: a tier-2 configuration event is rejected; the event fails with
// the rejection reason on its resolution.
#[tokio::test]
async fn test_configuration_event_rejection() {
    let engine = default_engine();

    let outcome = engine
        .report(report(EventKind::Configuration, Severity::Medium, "config drift"))
        .await
        .unwrap();
    assert_eq!(outcome.event.status, EventStatus::PendingApproval);
    assert_eq!(outcome.event.risk_tier(), Some(RiskTier::Moderate));

    let action_id = outcome.event.action.unwrap().id;
    let event = engine
        .reject(&action_id, Some("false positive".to_string()))
        .unwrap();
    assert_eq!(event.status, EventStatus::Failed);

    let resolution = event.resolution.unwrap();
    assert_eq!(resolution.notes.as_deref(), Some("false positive"));
    assert!(!resolution.verification_passed);
    assert_eq!(resolution.duration_ms, 0);
}

// Scenario D: after A-C (with B approved but still executing), the stats
// reflect one resolved, one failed, nothing pending, success rate 0.5.
#[tokio::test]
async fn test_stats_after_mixed_scenarios() {
    let engine = engine_with(Arc::new(SlowIsolationActuator));

    // A: resource event resolves.
    let a = engine
        .report(report(EventKind::Resource, Severity::High, "memory pressure"))
        .await
        .unwrap();
    wait_for_status(&engine, &a.event.id, EventStatus::Resolved).await;

    // B: security event approved; isolation runs long, so it stays executing.
    let b = engine
        .report(report(EventKind::Security, Severity::Critical, "anomalous access"))
        .await
        .unwrap();
    let b_action = b.event.action.unwrap().id;
    engine.approve(&b_action).unwrap();

    // C: configuration event rejected.
    let c = engine
        .report(report(EventKind::Configuration, Severity::Medium, "config drift"))
        .await
        .unwrap();
    let c_action = c.event.action.unwrap().id;
    engine.reject(&c_action, Some("false positive".to_string())).unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status.resolved, 1);
    assert_eq!(stats.by_status.failed, 1);
    assert_eq!(stats.by_status.pending_approval, 0);
    assert_eq!(stats.by_status.executing, 1);
    assert_eq!(stats.success_rate, 0.5);
    assert_eq!(stats.auto_resolved, 1);
    assert_eq!(stats.by_tier.tier1, 1);
    assert_eq!(stats.by_tier.tier2, 1);
    assert_eq!(stats.by_tier.tier3, 1);
    assert_eq!(stats.last_24h, 3);
}

// A delayed completion must not resurrect an event escalated mid-execution.
#[tokio::test]
async fn test_escalation_beats_delayed_completion() {
    let engine = engine_with(Arc::new(SlowIsolationActuator));

    let outcome = engine
        .report(report(EventKind::Security, Severity::Critical, "anomalous access"))
        .await
        .unwrap();
    let action_id = outcome.event.action.unwrap().id;
    engine.approve(&action_id).unwrap();

    let event = engine.escalate(&outcome.event.id).unwrap();
    assert_eq!(event.status, EventStatus::Escalated);
    // Tier was already 3; escalation keeps it capped.
    assert_eq!(event.diagnosis.unwrap().risk_tier, RiskTier::High);

    // Give the (slow) actuator no chance to matter: status stays escalated
    // and no resolution is ever attached.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let event = engine.get(&outcome.event.id).unwrap();
    assert_eq!(event.status, EventStatus::Escalated);
    assert!(event.resolution.is_none());
}

// Failed actuations land in the event's own state, never as caller errors.
#[tokio::test]
async fn test_actuator_failure_fails_event() {
    let engine = engine_with(Arc::new(SimulatedActuator::failing(Duration::from_millis(
        10,
    ))));

    let outcome = engine
        .report(report(EventKind::Performance, Severity::Medium, "latency spike"))
        .await
        .unwrap();
    assert!(outcome.auto_executed);

    wait_for_status(&engine, &outcome.event.id, EventStatus::Failed).await;

    let event = engine.get(&outcome.event.id).unwrap();
    let resolution = event.resolution.unwrap();
    assert!(!resolution.verification_passed);
    assert!(resolution.notes.unwrap().contains("simulated failure"));

    let stats = engine.stats().unwrap();
    assert_eq!(stats.by_status.failed, 1);
    assert_eq!(stats.success_rate, 0.0);
}

// The lifecycle event stream carries the full audit trail of a report.
#[tokio::test]
async fn test_engine_event_stream() {
    let engine = default_engine();
    let mut events = engine.subscribe();

    engine
        .report(report(EventKind::Security, Severity::Critical, "anomalous access"))
        .await
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(events.recv().await.unwrap().event_type());
    }
    assert_eq!(
        seen,
        vec![
            "event_reported",
            "diagnosis_recorded",
            "action_proposed",
            "approval_requested"
        ]
    );
}

//! The response engine: ingestion, tier policy dispatch, approval workflow
//! and reporting, wired over the injected registry, provider, actuator and
//! notification sink.
//!
//! `report` runs synchronously through diagnosis and tiering; execution
//! completion arrives later via the controller's callback. Per-event
//! atomicity lives in the registry; the engine sequences the steps and
//! publishes the audit trail.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{info, warn};

use crate::diagnosis::{fallback_diagnosis, DiagnosisProvider};
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EventBus, SharedEventBus};
use crate::executor::{Actuator, ExecutionContext, ExecutionController};
use crate::model::{
    EventKind, EventStatus, IncidentEvent, RiskTier, Severity, SuggestedAction,
};
use crate::notify::{dispatch, Notification, NotificationPhase, NotificationSink};
use crate::policy::{PolicyDecision, TierPolicy};
use crate::registry::EventRegistry;
use crate::stats::{aggregate, EngineStats};
use crate::synthesizer::synthesize;

/// Shared reference to the response engine.
pub type SharedResponseEngine = Arc<ResponseEngine>;

/// A raw incident report from an external event source.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReportedEvent {
    pub source: String,
    /// Event category; `type` is accepted as an alias on the wire.
    #[serde(alias = "type")]
    pub kind: EventKind,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// What ingestion produced for the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReportOutcome {
    pub event: IncidentEvent,
    pub auto_executed: bool,
}

/// Bounded event listing with registry-wide counters.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventListing {
    pub events: Vec<IncidentEvent>,
    pub total: usize,
    pub pending: usize,
}

/// Tiered-autonomy incident response engine.
pub struct ResponseEngine {
    registry: Arc<dyn EventRegistry>,
    provider: Arc<dyn DiagnosisProvider>,
    controller: ExecutionController,
    notifier: Arc<dyn NotificationSink>,
    policy: RwLock<TierPolicy>,
    bus: SharedEventBus,
}

impl ResponseEngine {
    pub fn new(
        registry: Arc<dyn EventRegistry>,
        provider: Arc<dyn DiagnosisProvider>,
        actuator: Arc<dyn Actuator>,
        notifier: Arc<dyn NotificationSink>,
        policy: TierPolicy,
    ) -> Self {
        let bus = EventBus::new().shared();
        let controller = ExecutionController::new(
            Arc::clone(&registry),
            actuator,
            Arc::clone(&bus),
            Arc::clone(&notifier),
        );
        Self {
            registry,
            provider,
            controller,
            notifier,
            policy: RwLock::new(policy),
            bus,
        }
    }

    /// Create a shared reference to this engine.
    pub fn shared(self) -> SharedResponseEngine {
        Arc::new(self)
    }

    /// Subscribe to the engine's lifecycle event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    /// Replace the tier policy. In-flight decisions keep the snapshot they
    /// already read.
    pub fn reload_policy(&self, policy: TierPolicy) {
        match self.policy.write() {
            Ok(mut guard) => {
                *guard = policy;
                info!("tier policy reloaded");
            }
            Err(_) => warn!("tier policy lock poisoned; reload dropped"),
        }
    }

    fn tier_context(&self, tier: RiskTier) -> EngineResult<(PolicyDecision, ExecutionContext)> {
        let policy = self
            .policy
            .read()
            .map_err(|_| EngineError::Internal("tier policy lock poisoned".to_string()))?;
        let config = policy.for_tier(tier);
        Ok((
            policy.decide(tier),
            ExecutionContext {
                max_retries: config.max_retries,
                cooldown_minutes: config.cooldown_minutes,
                notify_after: config.notify_after,
            },
        ))
    }

    /// Ingest a reported event: diagnose, synthesize the remediation and
    /// apply the tier policy fork. Returns once tiering is applied; any
    /// execution completes asynchronously.
    pub async fn report(&self, report: ReportedEvent) -> EngineResult<ReportOutcome> {
        let event = IncidentEvent::new(
            report.source,
            report.kind,
            report.severity,
            report.description,
            report.details,
        );
        let event_id = event.id.clone();
        self.registry.insert(event)?;
        self.bus.publish(EngineEvent::EventReported {
            event_id: event_id.clone(),
            kind: report.kind,
            severity: report.severity,
            timestamp: Utc::now(),
        });

        self.registry.begin_diagnosis(&event_id)?;
        let snapshot = self.registry.get(&event_id)?;

        let (diagnosis, fallback) = match self.provider.diagnose(&snapshot).await {
            Ok(diagnosis) => (diagnosis, false),
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "diagnosis failed, applying fail-safe default");
                (fallback_diagnosis(), true)
            }
        };
        let tier = diagnosis.risk_tier;
        self.bus.publish(EngineEvent::DiagnosisRecorded {
            event_id: event_id.clone(),
            risk_tier: tier,
            confidence: diagnosis.confidence,
            fallback,
            timestamp: Utc::now(),
        });

        let action = synthesize(&snapshot, &diagnosis);
        let action_id = action.id.clone();
        self.registry
            .record_diagnosis(&event_id, diagnosis, action.clone())?;
        self.bus.publish(EngineEvent::ActionProposed {
            event_id: event_id.clone(),
            action_id: action_id.clone(),
            kind: action.kind,
            timestamp: Utc::now(),
        });

        // The tier policy is evaluated exactly once per event, here.
        let (decision, ctx) = self.tier_context(tier)?;
        match decision {
            PolicyDecision::AutoExecute { notify_before } => {
                if notify_before {
                    dispatch(
                        Arc::clone(&self.notifier),
                        Notification::new(
                            event_id.clone(),
                            Some(action_id.clone()),
                            Some(tier),
                            NotificationPhase::BeforeExecution,
                            format!("auto-executing {} for tier {} event", action.kind, tier),
                        ),
                    );
                }
                let event = self.registry.start_auto_execution(&event_id)?;
                info!(event_id = %event_id, action_id = %action_id, tier = %tier, "auto-executing remediation");
                self.bus.publish(EngineEvent::ExecutionStarted {
                    event_id: event_id.clone(),
                    action_id: action_id.clone(),
                    auto: true,
                    timestamp: Utc::now(),
                });
                self.controller.spawn(event.clone(), action, ctx);
                Ok(ReportOutcome {
                    event,
                    auto_executed: true,
                })
            }
            PolicyDecision::RequireApproval => {
                let event = self.registry.queue_for_approval(&event_id)?;
                info!(event_id = %event_id, action_id = %action_id, tier = %tier, "awaiting operator approval");
                self.bus.publish(EngineEvent::ApprovalRequested {
                    event_id: event_id.clone(),
                    action_id: action_id.clone(),
                    risk_tier: tier,
                    timestamp: Utc::now(),
                });
                dispatch(
                    Arc::clone(&self.notifier),
                    Notification::new(
                        event_id,
                        Some(action_id),
                        Some(tier),
                        NotificationPhase::ApprovalRequested,
                        format!("tier {tier} remediation awaiting approval: {}", action.kind),
                    ),
                );
                Ok(ReportOutcome {
                    event,
                    auto_executed: false,
                })
            }
        }
    }

    /// Approve a pending action and start its execution.
    ///
    /// Fails with `NotFound` for an unknown action id and `InvalidState` if
    /// the owning event is not currently `pending_approval` (e.g. lost a
    /// race against a concurrent reject).
    pub fn approve(&self, action_id: &str) -> EngineResult<IncidentEvent> {
        let event = self.registry.approve_action(action_id)?;
        let action = event
            .action
            .clone()
            .ok_or_else(|| EngineError::Internal("approved event has no action".to_string()))?;
        let tier = action.risk_tier;
        let (_, ctx) = self.tier_context(tier)?;

        info!(event_id = %event.id, action_id = %action_id, "action approved");
        self.bus.publish(EngineEvent::ActionApproved {
            event_id: event.id.clone(),
            action_id: action_id.to_string(),
            timestamp: Utc::now(),
        });
        self.bus.publish(EngineEvent::ExecutionStarted {
            event_id: event.id.clone(),
            action_id: action_id.to_string(),
            auto: false,
            timestamp: Utc::now(),
        });
        self.controller.spawn(event.clone(), action, ctx);
        Ok(event)
    }

    /// Reject a pending action, failing the event with a rejection
    /// resolution. Same guards as [`ResponseEngine::approve`].
    pub fn reject(&self, action_id: &str, reason: Option<String>) -> EngineResult<IncidentEvent> {
        let resolution =
            crate::model::Resolution::rejection(action_id.to_string(), reason.clone());
        let event = self.registry.reject_action(action_id, resolution)?;

        info!(event_id = %event.id, action_id = %action_id, "action rejected");
        self.bus.publish(EngineEvent::ActionRejected {
            event_id: event.id.clone(),
            action_id: action_id.to_string(),
            reason: reason.clone(),
            timestamp: Utc::now(),
        });
        self.bus.publish(EngineEvent::EventFailed {
            event_id: event.id.clone(),
            action_id: Some(action_id.to_string()),
            reason: reason.unwrap_or_else(|| "rejected by operator".to_string()),
            timestamp: Utc::now(),
        });
        Ok(event)
    }

    /// Manual operator escalation: raises the tier by one (capped at 3) and
    /// removes the event from automated handling. Only non-terminal events
    /// may escalate.
    pub fn escalate(&self, event_id: &str) -> EngineResult<IncidentEvent> {
        let (event, new_tier) = self.registry.escalate(event_id)?;

        info!(event_id = %event_id, tier = %new_tier, "event escalated to human workflow");
        self.bus.publish(EngineEvent::EventEscalated {
            event_id: event_id.to_string(),
            new_tier,
            timestamp: Utc::now(),
        });
        dispatch(
            Arc::clone(&self.notifier),
            Notification::new(
                event_id.to_string(),
                event.action.as_ref().map(|a| a.id.clone()),
                Some(new_tier),
                NotificationPhase::Escalated,
                format!("event escalated to tier {new_tier}; manual handling required"),
            ),
        );
        Ok(event)
    }

    /// Snapshot of a single event.
    pub fn get(&self, event_id: &str) -> EngineResult<IncidentEvent> {
        Ok(self.registry.get(event_id)?)
    }

    /// Events newest-first, optionally filtered by status, with registry
    /// totals.
    pub fn list(&self, status: Option<EventStatus>, limit: usize) -> EngineResult<EventListing> {
        let events = self.registry.list(status, limit)?;
        let total = self.registry.count()?;
        let pending = self
            .registry
            .count_by_status(EventStatus::PendingApproval)?;
        Ok(EventListing {
            events,
            total,
            pending,
        })
    }

    /// Actions currently awaiting operator approval, newest first.
    pub fn pending_actions(&self) -> EngineResult<Vec<SuggestedAction>> {
        let mut actions: Vec<SuggestedAction> = self
            .registry
            .list(Some(EventStatus::PendingApproval), usize::MAX)?
            .into_iter()
            .filter_map(|event| event.action)
            .collect();
        actions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(actions)
    }

    /// Aggregate statistics computed from the registry at call time.
    pub fn stats(&self) -> EngineResult<EngineStats> {
        let snapshot = self.registry.snapshot()?;
        Ok(aggregate(&snapshot, Utc::now()))
    }
}

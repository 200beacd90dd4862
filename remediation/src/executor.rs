//! Execution controller: drives the pluggable actuator and records the
//! outcome.
//!
//! The actuator runs on its own Tokio task; the triggering request never
//! waits for it. The completion callback is idempotent and state-checked:
//! it applies the resolution only while the event is still `executing`, so a
//! delayed completion cannot resurrect an event that was concurrently
//! escalated or rejected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{EngineEvent, SharedEventBus};
use crate::model::{IncidentEvent, Resolution, ResolutionStatus, SuggestedAction};
use crate::notify::{dispatch, Notification, NotificationPhase, NotificationSink};
use crate::registry::{EventRegistry, RegistryError};

/// Error type for actuator implementations.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("actuator failed: {0}")]
    Failed(String),
}

/// What the actuator observed after running a remediation.
#[derive(Debug, Clone)]
pub struct ActuationReport {
    /// Success or partial; outright failure is an [`ActuatorError`].
    pub status: ResolutionStatus,
    /// Did the post-execution health check confirm the fix.
    pub verification_passed: bool,
    pub output: Option<String>,
}

impl ActuationReport {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: ResolutionStatus::Success,
            verification_passed: true,
            output: Some(output.into()),
        }
    }
}

/// Retry configuration handed to the actuator.
///
/// These values come from the owning tier's [`crate::policy::TierConfig`];
/// they are inputs for the actuator's own retry behavior, not enforced by
/// the engine core.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    pub max_retries: u32,
    pub cooldown_minutes: u32,
    /// Whether the owning tier wants an after-execution notification.
    pub notify_after: bool,
}

/// Pluggable remediation actuator.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn execute(
        &self,
        event: &IncidentEvent,
        action: &SuggestedAction,
        ctx: &ExecutionContext,
    ) -> Result<ActuationReport, ActuatorError>;
}

/// Actuator that simulates remediation with a fixed latency.
///
/// Used by the server binary and the test suites. Always verifies; failure
/// injection is available for exercising the failure path.
pub struct SimulatedActuator {
    latency: Duration,
    fail: bool,
}

impl SimulatedActuator {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail: false,
        }
    }

    /// A simulator that fails every execution.
    pub fn failing(latency: Duration) -> Self {
        Self {
            latency,
            fail: true,
        }
    }
}

#[async_trait]
impl Actuator for SimulatedActuator {
    async fn execute(
        &self,
        _event: &IncidentEvent,
        action: &SuggestedAction,
        _ctx: &ExecutionContext,
    ) -> Result<ActuationReport, ActuatorError> {
        tokio::time::sleep(self.latency).await;
        if self.fail {
            return Err(ActuatorError::Failed(format!(
                "simulated failure running {}",
                action.kind
            )));
        }
        Ok(ActuationReport::success(format!(
            "simulated: {}",
            action.description
        )))
    }
}

/// Runs actuations and reports resolutions back into the registry.
pub struct ExecutionController {
    registry: Arc<dyn EventRegistry>,
    actuator: Arc<dyn Actuator>,
    bus: SharedEventBus,
    sink: Arc<dyn NotificationSink>,
}

impl ExecutionController {
    pub fn new(
        registry: Arc<dyn EventRegistry>,
        actuator: Arc<dyn Actuator>,
        bus: SharedEventBus,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            registry,
            actuator,
            bus,
            sink,
        }
    }

    /// Trigger remediation for an event whose status is already `executing`.
    ///
    /// Returns the task handle; callers other than tests drop it.
    pub fn spawn(
        &self,
        event: IncidentEvent,
        action: SuggestedAction,
        ctx: ExecutionContext,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let actuator = Arc::clone(&self.actuator);
        let bus = Arc::clone(&self.bus);
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            let started = Instant::now();
            if let Err(e) = registry.mark_action_executing(&action.id) {
                debug!(action_id = %action.id, error = %e, "could not mark action executing");
            }

            let outcome = actuator.execute(&event, &action, &ctx).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let (resolution, success) = match outcome {
                Ok(report) => (
                    Resolution {
                        action_id: action.id.clone(),
                        status: report.status,
                        timestamp: Utc::now(),
                        duration_ms,
                        verification_passed: report.verification_passed,
                        output: report.output,
                        notes: None,
                    },
                    true,
                ),
                Err(e) => {
                    warn!(event_id = %event.id, action_id = %action.id, error = %e, "actuation failed");
                    (
                        Resolution {
                            action_id: action.id.clone(),
                            status: ResolutionStatus::Failed,
                            timestamp: Utc::now(),
                            duration_ms,
                            verification_passed: false,
                            output: None,
                            notes: Some(e.to_string()),
                        },
                        false,
                    )
                }
            };

            match registry.complete_execution(&event.id, resolution.clone(), success) {
                Ok(final_status) => {
                    info!(
                        event_id = %event.id,
                        status = %final_status,
                        duration_ms,
                        "execution completed"
                    );
                    if success {
                        bus.publish(EngineEvent::EventResolved {
                            event_id: event.id.clone(),
                            action_id: action.id.clone(),
                            duration_ms,
                            verification_passed: resolution.verification_passed,
                            timestamp: Utc::now(),
                        });
                    } else {
                        bus.publish(EngineEvent::EventFailed {
                            event_id: event.id.clone(),
                            action_id: Some(action.id.clone()),
                            reason: resolution
                                .notes
                                .clone()
                                .unwrap_or_else(|| "actuation failed".to_string()),
                            timestamp: Utc::now(),
                        });
                    }
                    if ctx.notify_after {
                        dispatch(
                            sink,
                            Notification::new(
                                event.id.clone(),
                                Some(action.id.clone()),
                                Some(action.risk_tier),
                                NotificationPhase::AfterExecution,
                                format!(
                                    "{} completed with status {}",
                                    action.kind, resolution.status
                                ),
                            ),
                        );
                    }
                }
                Err(RegistryError::StatusConflict { actual, .. }) => {
                    // The event left `executing` while the actuator ran
                    // (escalated or rejected). The late result is dropped.
                    debug!(
                        event_id = %event.id,
                        status = %actual,
                        "stale completion ignored"
                    );
                }
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "failed to record resolution");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::model::{
        ActionStatus, Diagnosis, EventKind, EventStatus, RiskTier, Severity,
    };
    use crate::notify::TracingNotifier;
    use crate::registry::MemoryRegistry;
    use crate::synthesizer::synthesize;

    fn context() -> ExecutionContext {
        ExecutionContext {
            max_retries: 0,
            cooldown_minutes: 0,
            notify_after: false,
        }
    }

    /// Registry seeded with one event in `executing` status.
    fn executing_event(
        registry: &Arc<MemoryRegistry>,
        tier: RiskTier,
    ) -> (IncidentEvent, SuggestedAction) {
        let event = IncidentEvent::new(
            "monitor",
            EventKind::Resource,
            Severity::High,
            "test",
            serde_json::json!({}),
        );
        let id = event.id.clone();
        registry.insert(event.clone()).unwrap();
        registry.begin_diagnosis(&id).unwrap();
        let diagnosis = Diagnosis::new(0.9, "cause", "reasoning", tier, vec![]);
        let action = synthesize(&event, &diagnosis);
        registry
            .record_diagnosis(&id, diagnosis, action.clone())
            .unwrap();
        let event = registry.start_auto_execution(&id).unwrap();
        (event, action)
    }

    fn controller(
        registry: Arc<MemoryRegistry>,
        actuator: Arc<dyn Actuator>,
    ) -> ExecutionController {
        ExecutionController::new(
            registry,
            actuator,
            EventBus::new().shared(),
            Arc::new(TracingNotifier),
        )
    }

    #[tokio::test]
    async fn test_successful_execution_resolves_event() {
        let registry = MemoryRegistry::new().shared();
        let (event, action) = executing_event(&registry, RiskTier::Low);
        let controller = controller(
            registry.clone(),
            Arc::new(SimulatedActuator::new(Duration::from_millis(5))),
        );

        controller
            .spawn(event.clone(), action, context())
            .await
            .unwrap();

        let event = registry.get(&event.id).unwrap();
        assert_eq!(event.status, EventStatus::Resolved);
        let resolution = event.resolution.unwrap();
        assert!(resolution.verification_passed);
        assert_eq!(resolution.status, ResolutionStatus::Success);
        assert_eq!(event.action.unwrap().status, ActionStatus::Completed);
    }

    #[tokio::test]
    async fn test_actuator_failure_is_absorbed_into_resolution() {
        let registry = MemoryRegistry::new().shared();
        let (event, action) = executing_event(&registry, RiskTier::Low);
        let controller = controller(
            registry.clone(),
            Arc::new(SimulatedActuator::failing(Duration::from_millis(5))),
        );

        controller
            .spawn(event.clone(), action, context())
            .await
            .unwrap();

        let event = registry.get(&event.id).unwrap();
        assert_eq!(event.status, EventStatus::Failed);
        let resolution = event.resolution.unwrap();
        assert!(!resolution.verification_passed);
        assert_eq!(resolution.status, ResolutionStatus::Failed);
        assert!(resolution.notes.unwrap().contains("simulated failure"));
    }

    #[tokio::test]
    async fn test_stale_completion_is_a_no_op() {
        let registry = MemoryRegistry::new().shared();
        let (event, action) = executing_event(&registry, RiskTier::Low);
        let controller = controller(
            registry.clone(),
            Arc::new(SimulatedActuator::new(Duration::from_millis(50))),
        );

        let handle = controller.spawn(event.clone(), action, context());

        // Escalate while the actuator is mid-flight.
        registry.escalate(&event.id).unwrap();
        handle.await.unwrap();

        let event = registry.get(&event.id).unwrap();
        assert_eq!(event.status, EventStatus::Escalated);
        assert!(event.resolution.is_none());
    }
}

//! Operator notification sink.
//!
//! Notifications are fire-and-forget: the engine spawns the delivery and
//! moves on, and a failing sink is logged without ever blocking the state
//! machine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{ActionId, EventId, RiskTier};

/// Where in the lifecycle a notification originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPhase {
    BeforeExecution,
    AfterExecution,
    ApprovalRequested,
    Escalated,
}

impl std::fmt::Display for NotificationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeExecution => write!(f, "before_execution"),
            Self::AfterExecution => write!(f, "after_execution"),
            Self::ApprovalRequested => write!(f, "approval_requested"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

/// A single operator-facing notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub event_id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<ActionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tier: Option<RiskTier>,
    pub phase: NotificationPhase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        event_id: impl Into<EventId>,
        action_id: Option<ActionId>,
        risk_tier: Option<RiskTier>,
        phase: NotificationPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            action_id,
            risk_tier,
            phase,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Delivery target for operator notifications.
///
/// Implementations must absorb their own failures; delivery is best-effort
/// by contract.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Fire-and-forget dispatch: spawn the delivery and return immediately.
pub fn dispatch(sink: Arc<dyn NotificationSink>, notification: Notification) {
    tokio::spawn(async move {
        sink.notify(notification).await;
    });
}

/// Sink that emits notifications as structured log lines.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn notify(&self, notification: Notification) {
        info!(
            event_id = %notification.event_id,
            phase = %notification.phase,
            "{}",
            notification.message
        );
    }
}

/// Sink that POSTs the JSON notification to a webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, notification: Notification) {
        let result = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    event_id = %notification.event_id,
                    status = %response.status(),
                    "webhook notification rejected"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    event_id = %notification.event_id,
                    error = %e,
                    "webhook notification failed"
                );
            }
        }
    }
}

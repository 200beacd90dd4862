//! Statistics aggregator.
//!
//! All metrics are derived from a registry snapshot at call time; nothing is
//! stored redundantly. Snapshots are eventually consistent with in-flight
//! writes, which is acceptable for reporting.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{EventStatus, IncidentEvent, RiskTier};

/// Event counts per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub detected: usize,
    pub diagnosing: usize,
    pub pending_approval: usize,
    pub executing: usize,
    pub resolved: usize,
    pub failed: usize,
    pub escalated: usize,
}

impl StatusBreakdown {
    fn record(&mut self, status: EventStatus) {
        match status {
            EventStatus::Detected => self.detected += 1,
            EventStatus::Diagnosing => self.diagnosing += 1,
            EventStatus::PendingApproval => self.pending_approval += 1,
            EventStatus::Executing => self.executing += 1,
            EventStatus::Resolved => self.resolved += 1,
            EventStatus::Failed => self.failed += 1,
            EventStatus::Escalated => self.escalated += 1,
        }
    }
}

/// Diagnosed event counts per risk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub tier1: usize,
    pub tier2: usize,
    pub tier3: usize,
}

impl TierBreakdown {
    fn record(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Low => self.tier1 += 1,
            RiskTier::Moderate => self.tier2 += 1,
            RiskTier::High => self.tier3 += 1,
        }
    }
}

/// Aggregate reporting metrics for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Total events ever reported.
    pub total: usize,
    /// Events reported within the trailing 24 hours.
    pub last_24h: usize,
    pub by_status: StatusBreakdown,
    pub by_tier: TierBreakdown,
    /// Resolved events whose diagnosis was tier 1, i.e. resolved without any
    /// approval step.
    pub auto_resolved: usize,
    /// `resolved / max(resolved + failed, 1)`. Events still pending or
    /// executing are excluded from the denominator.
    pub success_rate: f64,
}

/// Compute engine statistics from a registry snapshot.
pub fn aggregate(events: &[IncidentEvent], now: DateTime<Utc>) -> EngineStats {
    let mut by_status = StatusBreakdown::default();
    let mut by_tier = TierBreakdown::default();
    let mut last_24h = 0;
    let mut auto_resolved = 0;
    let cutoff = now - Duration::hours(24);

    for event in events {
        by_status.record(event.status);
        if let Some(tier) = event.risk_tier() {
            by_tier.record(tier);
        }
        if event.timestamp >= cutoff {
            last_24h += 1;
        }
        if event.status == EventStatus::Resolved && event.risk_tier() == Some(RiskTier::Low) {
            auto_resolved += 1;
        }
    }

    let resolved = by_status.resolved;
    let failed = by_status.failed;
    let success_rate = resolved as f64 / (resolved + failed).max(1) as f64;

    EngineStats {
        total: events.len(),
        last_24h,
        by_status,
        by_tier,
        auto_resolved,
        success_rate,
    }
}

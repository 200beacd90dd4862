//! Action synthesizer: turns a diagnosis into a concrete suggested action.

use chrono::Utc;
use uuid::Uuid;

use crate::model::{ActionKind, ActionStatus, Diagnosis, IncidentEvent, RiskTier, SuggestedAction};

/// Estimated operational impact for a tier.
fn estimated_impact(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Low => "minimal, automated",
        RiskTier::Moderate => "moderate, brief impact possible",
        RiskTier::High => "significant, human verification required",
    }
}

/// Derive the suggested action for a diagnosed event.
///
/// The provider pre-orders its candidates, so the first entry wins; an empty
/// candidate list falls back to `notify_team`. A rollback plan is attached
/// only for tier >= 2: tier-1 actions are defined to be trivially
/// reversible.
pub fn synthesize(event: &IncidentEvent, diagnosis: &Diagnosis) -> SuggestedAction {
    let kind = diagnosis
        .recommended_actions
        .first()
        .copied()
        .unwrap_or(ActionKind::NotifyTeam);
    let tier = diagnosis.risk_tier;

    let rollback_plan = if tier >= RiskTier::Moderate {
        Some(kind.rollback_plan().to_string())
    } else {
        None
    };

    SuggestedAction {
        id: Uuid::new_v4().to_string(),
        event_id: event.id.clone(),
        kind,
        risk_tier: tier,
        description: kind.description().to_string(),
        estimated_impact: estimated_impact(tier).to_string(),
        rollback_plan,
        status: ActionStatus::Pending,
        created_at: Utc::now(),
    }
}

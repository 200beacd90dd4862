//! Tier policy engine: per-tier configuration and the dispatch decision.
//!
//! The policy is consulted exactly once per event, at the
//! `diagnosing → {executing | pending_approval}` fork. Later approve, reject
//! or escalate calls never re-evaluate it. The policy is loaded at startup
//! (TOML file or built-in defaults) and may be hot-reloaded, but a single
//! decision always reads one consistent snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::RiskTier;

/// Error type for policy loading.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-tier dispatch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Remediate immediately without operator involvement.
    pub auto_execute: bool,
    /// Block on explicit human approval before acting. Dominates
    /// `auto_execute` when both are set.
    pub require_approval: bool,
    /// Notify operators before execution starts.
    pub notify_before: bool,
    /// Notify operators once execution completes.
    pub notify_after: bool,
    /// Retry budget for the actuator. Configuration input for the execution
    /// controller, not enforced by the engine core.
    pub max_retries: u32,
    /// Cooldown between retries, in minutes. Same contract as `max_retries`.
    pub cooldown_minutes: u32,
}

impl Default for TierConfig {
    fn default() -> Self {
        // The conservative shape: neither flag set still approval-gates.
        Self {
            auto_execute: false,
            require_approval: true,
            notify_before: true,
            notify_after: true,
            max_retries: 0,
            cooldown_minutes: 15,
        }
    }
}

/// What the policy engine decided for a diagnosed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Dispatch to the execution controller immediately.
    AutoExecute { notify_before: bool },
    /// Enqueue the suggested action and wait for an operator.
    RequireApproval,
}

/// Process-wide tier policy, one entry per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicy {
    pub tier1: TierConfig,
    pub tier2: TierConfig,
    pub tier3: TierConfig,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            tier1: TierConfig {
                auto_execute: true,
                require_approval: false,
                notify_before: false,
                notify_after: true,
                max_retries: 2,
                cooldown_minutes: 5,
            },
            tier2: TierConfig {
                auto_execute: false,
                require_approval: true,
                notify_before: true,
                notify_after: true,
                max_retries: 1,
                cooldown_minutes: 15,
            },
            tier3: TierConfig {
                auto_execute: false,
                require_approval: true,
                notify_before: true,
                notify_after: true,
                max_retries: 0,
                cooldown_minutes: 60,
            },
        }
    }
}

impl TierPolicy {
    /// Load a policy from a TOML file. A tier table that is absent falls
    /// back to the default policy for that tier; a field that is absent
    /// within a specified tier table falls back to the conservative
    /// [`TierConfig`] default, so a partially specified tier can never
    /// silently auto-execute.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse a policy from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(raw)?)
    }

    /// The configuration for a tier.
    pub fn for_tier(&self, tier: RiskTier) -> &TierConfig {
        match tier {
            RiskTier::Low => &self.tier1,
            RiskTier::Moderate => &self.tier2,
            RiskTier::High => &self.tier3,
        }
    }

    /// Decide the next lifecycle transition for a diagnosed event.
    ///
    /// `require_approval` wins over `auto_execute`; a tier with neither flag
    /// set is approval-gated so a misconfigured tier can never silently
    /// auto-execute.
    pub fn decide(&self, tier: RiskTier) -> PolicyDecision {
        let config = self.for_tier(tier);
        if config.require_approval || !config.auto_execute {
            PolicyDecision::RequireApproval
        } else {
            PolicyDecision::AutoExecute {
                notify_before: config.notify_before,
            }
        }
    }
}

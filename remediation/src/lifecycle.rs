//! Event state machine: legal transition guards for [`EventStatus`].
//!
//! The lifecycle is:
//!
//! ```text
//! detected → diagnosing → executing ────────→ resolved
//!                │             │
//!                │             └────────────→ failed
//!                └→ pending_approval → executing (approve)
//!                            └───────→ failed    (reject)
//! any non-terminal state ────────────→ escalated
//! ```
//!
//! `resolved`, `failed` and `escalated` are terminal: an escalated event is
//! routed to a higher-tier human workflow outside this engine.

use crate::model::EventStatus;

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: EventStatus,
    pub to: EventStatus,
}

impl std::fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal status transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Whether `from → to` is a legal edge in the lifecycle graph.
pub fn is_legal_transition(from: EventStatus, to: EventStatus) -> bool {
    use EventStatus::*;

    // Any non-terminal state can be escalated out of automated handling.
    if to == Escalated && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Detected, Diagnosing)
            // Tier policy fork
            | (Diagnosing, Executing)
            | (Diagnosing, PendingApproval)
            // Approval workflow
            | (PendingApproval, Executing)
            | (PendingApproval, Failed)
            // Execution completion callback
            | (Executing, Resolved)
            | (Executing, Failed)
    )
}

/// Validate a transition, for callers that want an error value.
pub fn validate_transition(from: EventStatus, to: EventStatus) -> Result<(), IllegalTransition> {
    if is_legal_transition(from, to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// All states reachable from `from` in a single transition.
pub fn allowed_transitions(from: EventStatus) -> Vec<EventStatus> {
    use EventStatus::*;

    [Detected, Diagnosing, PendingApproval, Executing, Resolved, Failed, Escalated]
        .into_iter()
        .filter(|to| is_legal_transition(from, *to))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventStatus::*;

    #[test]
    fn test_happy_path_transitions_are_legal() {
        assert!(is_legal_transition(Detected, Diagnosing));
        assert!(is_legal_transition(Diagnosing, Executing));
        assert!(is_legal_transition(Diagnosing, PendingApproval));
        assert!(is_legal_transition(PendingApproval, Executing));
        assert!(is_legal_transition(PendingApproval, Failed));
        assert!(is_legal_transition(Executing, Resolved));
        assert!(is_legal_transition(Executing, Failed));
    }

    #[test]
    fn test_escalation_reachable_from_non_terminal_only() {
        for from in [Detected, Diagnosing, PendingApproval, Executing] {
            assert!(is_legal_transition(from, Escalated), "from {from}");
        }
        for from in [Resolved, Failed, Escalated] {
            assert!(!is_legal_transition(from, Escalated), "from {from}");
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Resolved, Failed, Escalated] {
            assert!(allowed_transitions(from).is_empty(), "from {from}");
        }
    }

    #[test]
    fn test_completion_cannot_skip_execution() {
        assert!(!is_legal_transition(Detected, Resolved));
        assert!(!is_legal_transition(Diagnosing, Resolved));
        assert!(!is_legal_transition(PendingApproval, Resolved));
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!is_legal_transition(Executing, PendingApproval));
        assert!(!is_legal_transition(Executing, Diagnosing));
        assert!(!is_legal_transition(PendingApproval, Diagnosing));
        assert!(!is_legal_transition(Diagnosing, Detected));
    }

    #[test]
    fn test_validate_reports_both_ends() {
        let err = validate_transition(Resolved, Executing).unwrap_err();
        assert_eq!(err.from, Resolved);
        assert_eq!(err.to, Executing);
        assert!(err.to_string().contains("resolved"));
    }

    #[test]
    fn test_allowed_transitions_at_fork() {
        let allowed = allowed_transitions(Diagnosing);
        assert!(allowed.contains(&Executing));
        assert!(allowed.contains(&PendingApproval));
        assert!(allowed.contains(&Escalated));
        assert_eq!(allowed.len(), 3);
    }
}

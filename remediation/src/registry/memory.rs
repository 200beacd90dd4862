//! In-memory registry implementation.
//!
//! Events live in a `HashMap` of per-event mutexes; every guarded transition
//! locks exactly one event for the duration of its read-modify-write. A
//! secondary index maps action ids to their owning event. Index and map
//! locks are never held while waiting on an event mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use super::{EventRegistry, RegistryError, RegistryResult};
use crate::lifecycle;
use crate::model::{
    ActionId, ActionStatus, Diagnosis, EventId, EventStatus, IncidentEvent, Resolution,
    ResolutionStatus, RiskTier, SuggestedAction,
};

type EventSlot = Arc<Mutex<IncidentEvent>>;

/// In-memory [`EventRegistry`].
#[derive(Default)]
pub struct MemoryRegistry {
    events: RwLock<HashMap<EventId, EventSlot>>,
    actions: RwLock<HashMap<ActionId, EventId>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this registry.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn slot(&self, id: &str) -> RegistryResult<EventSlot> {
        let events = self.events.read().map_err(|_| RegistryError::LockPoisoned)?;
        events
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::EventNotFound(id.to_string()))
    }

    fn slot_by_action(&self, action_id: &str) -> RegistryResult<EventSlot> {
        let event_id = {
            let actions = self.actions.read().map_err(|_| RegistryError::LockPoisoned)?;
            actions
                .get(action_id)
                .cloned()
                .ok_or_else(|| RegistryError::ActionNotFound(action_id.to_string()))?
        };
        self.slot(&event_id)
    }

    fn all_slots(&self) -> RegistryResult<Vec<EventSlot>> {
        let events = self.events.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(events.values().cloned().collect())
    }

    /// Apply a lifecycle transition under the caller's event lock. The
    /// legality table doubles as the compare-and-set guard: a stale current
    /// status makes the requested edge illegal.
    fn apply_transition(event: &mut IncidentEvent, to: EventStatus) -> RegistryResult<()> {
        lifecycle::validate_transition(event.status, to).map_err(|e| {
            RegistryError::StatusConflict {
                id: event.id.clone(),
                actual: e.from,
                attempted: e.to,
            }
        })?;
        event.status = to;
        event.updated_at = Utc::now();
        Ok(())
    }

    /// The live action, checked against the id the caller holds. A stale
    /// action id (superseded action) reads as not found.
    fn live_action<'a>(
        event: &'a mut IncidentEvent,
        action_id: &str,
    ) -> RegistryResult<&'a mut SuggestedAction> {
        match event.action.as_mut() {
            Some(action) if action.id == action_id => Ok(action),
            _ => Err(RegistryError::ActionNotFound(action_id.to_string())),
        }
    }
}

impl EventRegistry for MemoryRegistry {
    fn insert(&self, event: IncidentEvent) -> RegistryResult<()> {
        let mut events = self.events.write().map_err(|_| RegistryError::LockPoisoned)?;
        events.insert(event.id.clone(), Arc::new(Mutex::new(event)));
        Ok(())
    }

    fn get(&self, id: &str) -> RegistryResult<IncidentEvent> {
        let slot = self.slot(id)?;
        let event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(event.clone())
    }

    fn find_by_action(&self, action_id: &str) -> RegistryResult<IncidentEvent> {
        let slot = self.slot_by_action(action_id)?;
        let event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(event.clone())
    }

    fn list(&self, status: Option<EventStatus>, limit: usize) -> RegistryResult<Vec<IncidentEvent>> {
        let mut events = Vec::new();
        for slot in self.all_slots()? {
            let event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
            if status.map_or(true, |s| event.status == s) {
                events.push(event.clone());
            }
        }
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        events.truncate(limit);
        Ok(events)
    }

    fn count(&self) -> RegistryResult<usize> {
        let events = self.events.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(events.len())
    }

    fn count_by_status(&self, status: EventStatus) -> RegistryResult<usize> {
        let mut count = 0;
        for slot in self.all_slots()? {
            let event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
            if event.status == status {
                count += 1;
            }
        }
        Ok(count)
    }

    fn snapshot(&self) -> RegistryResult<Vec<IncidentEvent>> {
        let mut events = Vec::new();
        for slot in self.all_slots()? {
            let event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
            events.push(event.clone());
        }
        Ok(events)
    }

    fn begin_diagnosis(&self, id: &str) -> RegistryResult<()> {
        let slot = self.slot(id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Self::apply_transition(&mut event, EventStatus::Diagnosing)
    }

    fn record_diagnosis(
        &self,
        id: &str,
        diagnosis: Diagnosis,
        action: SuggestedAction,
    ) -> RegistryResult<()> {
        let slot = self.slot(id)?;
        let superseded = {
            let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
            if event.status != EventStatus::Diagnosing {
                return Err(RegistryError::StatusConflict {
                    id: event.id.clone(),
                    actual: event.status,
                    attempted: EventStatus::Diagnosing,
                });
            }
            let superseded = event.action.take().map(|a| a.id);
            event.diagnosis = Some(diagnosis);
            event.action = Some(action.clone());
            event.updated_at = Utc::now();
            superseded
        };

        // Index maintenance outside the event lock; the live-action check in
        // approve/reject closes the window a stale index entry leaves open.
        let mut actions = self.actions.write().map_err(|_| RegistryError::LockPoisoned)?;
        if let Some(old) = superseded {
            actions.remove(&old);
        }
        actions.insert(action.id, id.to_string());
        Ok(())
    }

    fn start_auto_execution(&self, id: &str) -> RegistryResult<IncidentEvent> {
        let slot = self.slot(id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        if event.action.is_none() {
            return Err(RegistryError::MissingDiagnosis(event.id.clone()));
        }
        Self::apply_transition(&mut event, EventStatus::Executing)?;
        if let Some(action) = event.action.as_mut() {
            action.status = ActionStatus::Executing;
        }
        Ok(event.clone())
    }

    fn queue_for_approval(&self, id: &str) -> RegistryResult<IncidentEvent> {
        let slot = self.slot(id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Self::apply_transition(&mut event, EventStatus::PendingApproval)?;
        Ok(event.clone())
    }

    fn approve_action(&self, action_id: &str) -> RegistryResult<IncidentEvent> {
        let slot = self.slot_by_action(action_id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Self::live_action(&mut event, action_id)?;
        Self::apply_transition(&mut event, EventStatus::Executing)?;
        Self::live_action(&mut event, action_id)?.status = ActionStatus::Approved;
        Ok(event.clone())
    }

    fn mark_action_executing(&self, action_id: &str) -> RegistryResult<()> {
        let slot = self.slot_by_action(action_id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        // The event may have left `executing` (escalated) between dispatch
        // and the actuator task starting; the flip is then stale.
        if event.status != EventStatus::Executing {
            return Err(RegistryError::StatusConflict {
                id: event.id.clone(),
                actual: event.status,
                attempted: EventStatus::Executing,
            });
        }
        let action = Self::live_action(&mut event, action_id)?;
        match action.status {
            ActionStatus::Approved => {
                action.status = ActionStatus::Executing;
                event.updated_at = Utc::now();
                Ok(())
            }
            ActionStatus::Executing => Ok(()),
            other => Err(RegistryError::ActionStatusConflict {
                id: action_id.to_string(),
                actual: other,
            }),
        }
    }

    fn reject_action(
        &self,
        action_id: &str,
        resolution: Resolution,
    ) -> RegistryResult<IncidentEvent> {
        let slot = self.slot_by_action(action_id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Self::live_action(&mut event, action_id)?;
        if event.resolution.is_some() {
            return Err(RegistryError::ResolutionExists(event.id.clone()));
        }
        Self::apply_transition(&mut event, EventStatus::Failed)?;
        Self::live_action(&mut event, action_id)?.status = ActionStatus::Rejected;
        event.resolution = Some(resolution);
        Ok(event.clone())
    }

    fn complete_execution(
        &self,
        id: &str,
        resolution: Resolution,
        success: bool,
    ) -> RegistryResult<EventStatus> {
        let slot = self.slot(id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        let to = if success {
            EventStatus::Resolved
        } else {
            EventStatus::Failed
        };
        // The transition guard also enforces write-once: a resolution only
        // ever exists on a terminal event, and terminal states have no exits.
        Self::apply_transition(&mut event, to)?;
        if let Some(action) = event.action.as_mut() {
            action.status = match resolution.status {
                ResolutionStatus::Failed => ActionStatus::Failed,
                ResolutionStatus::Success | ResolutionStatus::Partial => ActionStatus::Completed,
            };
        }
        event.resolution = Some(resolution);
        Ok(to)
    }

    fn escalate(&self, id: &str) -> RegistryResult<(IncidentEvent, RiskTier)> {
        let slot = self.slot(id)?;
        let mut event = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        if event.diagnosis.is_none() {
            return Err(RegistryError::MissingDiagnosis(event.id.clone()));
        }
        Self::apply_transition(&mut event, EventStatus::Escalated)?;
        let tier = event
            .diagnosis
            .as_mut()
            .map(Diagnosis::escalate_tier)
            .unwrap_or(RiskTier::High);
        Ok((event.clone(), tier))
    }
}

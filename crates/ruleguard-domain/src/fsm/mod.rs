//! Per-rule lifecycle state machine and its process-wide registry.
//!
//! Mirrors this codebase's workflow-session entity: a small `Mutex`-guarded
//! state value, an explicit event/transition table, and a bounded audit
//! trail of past transitions kept for diagnostics rather than replay.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of [`Transition`] records retained per rule.
const TRANSITION_AUDIT_CAPACITY: usize = 32;

/// Lifecycle states a rule passes through under the administrator's
/// five-phase protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleState {
    /// No FSM entry exists for this id.
    Absent,
    /// Create has been requested; the rule is not yet validated.
    Draft,
    /// Input validation succeeded.
    Validated,
    /// The expression compiled into the rule engine.
    Compiled,
    /// The rule is durably stored and live.
    Persisted,
    /// An Update is in flight.
    Updating,
    /// A Delete is in flight.
    Deleting,
    /// The last phase transition failed and was rolled back.
    Failed,
}

impl std::fmt::Display for RuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Absent => "absent",
            Self::Draft => "draft",
            Self::Validated => "validated",
            Self::Compiled => "compiled",
            Self::Persisted => "persisted",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Events that drive state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleEvent {
    /// Begin creating a rule (`Absent` -> `Draft`).
    Create,
    /// Validation of a draft succeeded.
    Validate,
    /// Validation of a draft failed.
    ValidationFailed,
    /// The validated expression compiled into the engine.
    Compile,
    /// Compilation failed.
    CompilationFailed,
    /// The compiled rule was durably persisted.
    Persist,
    /// Persistence failed.
    PersistenceFailed,
    /// Begin an update of a persisted rule.
    Update,
    /// An update completed and the rule returns to `Persisted`.
    UpdateComplete,
    /// An update failed and was rolled back.
    UpdateFailed,
    /// Begin deleting a persisted rule.
    Delete,
    /// A delete completed; the entry is removed from the registry.
    DeleteComplete,
    /// A delete failed and was rolled back.
    DeleteFailed,
    /// Return a `Failed` rule to `Persisted` after a successful retry.
    Rollback,
}

impl std::fmt::Display for RuleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A single recorded state transition, kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// State before the event was applied.
    pub from: RuleState,
    /// Event applied.
    pub event: RuleEvent,
    /// State after the event was applied.
    pub to: RuleState,
    /// When the transition occurred.
    pub at: DateTime<Utc>,
}

fn next_state(current: RuleState, event: RuleEvent) -> Option<RuleState> {
    use RuleEvent::{
        Compile, CompilationFailed, Create, Delete, DeleteComplete, DeleteFailed, Persist,
        PersistenceFailed, Rollback, Update, UpdateComplete, UpdateFailed, Validate,
        ValidationFailed,
    };
    use RuleState::{Absent, Compiled, Deleting, Draft, Failed, Persisted, Updating, Validated};

    match (current, event) {
        (Absent, Create) => Some(Draft),
        (Draft, Validate) => Some(Validated),
        (Draft, ValidationFailed) => Some(Failed),
        (Validated, Compile) => Some(Compiled),
        (Validated, CompilationFailed) => Some(Failed),
        (Compiled, Persist) => Some(Persisted),
        (Compiled, PersistenceFailed) => Some(Failed),
        (Persisted, Update) => Some(Updating),
        (Persisted, Delete) => Some(Deleting),
        (Updating, UpdateComplete) => Some(Persisted),
        (Updating, UpdateFailed) => Some(Persisted),
        (Deleting, DeleteComplete) => Some(Absent),
        (Deleting, DeleteFailed) => Some(Persisted),
        (Failed, Rollback) => Some(Persisted),
        _ => None,
    }
}

/// The lifecycle state machine for a single rule id.
#[derive(Debug)]
pub struct RuleFsm {
    state: Mutex<RuleState>,
    history: Mutex<VecDeque<Transition>>,
}

impl RuleFsm {
    /// Construct a new FSM starting in `Absent`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RuleState::Absent),
            history: Mutex::new(VecDeque::with_capacity(TRANSITION_AUDIT_CAPACITY)),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RuleState {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Bounded audit trail, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Transition> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Apply `event` as an atomic check-and-set. Rejects the transition if
    /// the event is not valid for the current state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FailedPrecondition`] if `event` has no defined
    /// transition from the current state.
    pub fn apply(&self, event: RuleEvent) -> Result<RuleState> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let from = *state;
        let Some(to) = next_state(from, event) else {
            return Err(Error::failed_precondition(format!(
                "rule fsm: no transition for event {event} from state {from}"
            )));
        };
        *state = to;
        drop(state);

        let mut history = self
            .history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if history.len() == TRANSITION_AUDIT_CAPACITY {
            history.pop_front();
        }
        history.push_back(Transition {
            from,
            event,
            to,
            at: Utc::now(),
        });
        Ok(to)
    }
}

impl Default for RuleFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide registry of per-rule lifecycle state machines.
#[derive(Debug, Default)]
pub struct FsmRegistry {
    entries: DashMap<String, Arc<RuleFsm>>,
}

impl FsmRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the FSM for `rule_id`, creating a fresh `Absent` one if none
    /// exists yet. Used by phase-1 of the Create protocol.
    #[must_use]
    pub fn get_or_create(&self, rule_id: &str) -> Arc<RuleFsm> {
        Arc::clone(
            self.entries
                .entry(rule_id.to_owned())
                .or_insert_with(|| Arc::new(RuleFsm::new())),
        )
    }

    /// Return the FSM for `rule_id` if one has already been created.
    ///
    /// Query-only callers (e.g. `GetRule`) use this instead of
    /// `get_or_create` to avoid growing the registry for ids that were
    /// never created.
    #[must_use]
    pub fn get(&self, rule_id: &str) -> Option<Arc<RuleFsm>> {
        self.entries.get(rule_id).map(|entry| Arc::clone(&entry))
    }

    /// Remove the FSM for `rule_id`, typically once it reaches `Absent`
    /// after a completed Delete.
    pub fn remove(&self, rule_id: &str) {
        self.entries.remove(rule_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_moves_absent_to_draft() {
        let fsm = RuleFsm::new();
        assert_eq!(fsm.apply(RuleEvent::Create).unwrap(), RuleState::Draft);
    }

    #[test]
    fn full_create_sequence_reaches_persisted() {
        let fsm = RuleFsm::new();
        fsm.apply(RuleEvent::Create).unwrap();
        fsm.apply(RuleEvent::Validate).unwrap();
        fsm.apply(RuleEvent::Compile).unwrap();
        assert_eq!(fsm.apply(RuleEvent::Persist).unwrap(), RuleState::Persisted);
        assert_eq!(fsm.history().len(), 4);
    }

    #[test]
    fn delete_blocked_while_updating() {
        let fsm = RuleFsm::new();
        fsm.apply(RuleEvent::Create).unwrap();
        fsm.apply(RuleEvent::Validate).unwrap();
        fsm.apply(RuleEvent::Compile).unwrap();
        fsm.apply(RuleEvent::Persist).unwrap();
        fsm.apply(RuleEvent::Update).unwrap();
        assert!(fsm.apply(RuleEvent::Delete).is_err());
    }

    #[test]
    fn update_failure_rolls_back_to_persisted() {
        let fsm = RuleFsm::new();
        fsm.apply(RuleEvent::Create).unwrap();
        fsm.apply(RuleEvent::Validate).unwrap();
        fsm.apply(RuleEvent::Compile).unwrap();
        fsm.apply(RuleEvent::Persist).unwrap();
        fsm.apply(RuleEvent::Update).unwrap();
        assert_eq!(fsm.apply(RuleEvent::UpdateFailed).unwrap(), RuleState::Persisted);
    }

    #[test]
    fn delete_sequence_returns_to_absent() {
        let fsm = RuleFsm::new();
        fsm.apply(RuleEvent::Create).unwrap();
        fsm.apply(RuleEvent::Validate).unwrap();
        fsm.apply(RuleEvent::Compile).unwrap();
        fsm.apply(RuleEvent::Persist).unwrap();
        fsm.apply(RuleEvent::Delete).unwrap();
        assert_eq!(fsm.apply(RuleEvent::DeleteComplete).unwrap(), RuleState::Absent);
    }

    #[test]
    fn audit_trail_is_bounded() {
        let fsm = RuleFsm::new();
        fsm.apply(RuleEvent::Create).unwrap();
        fsm.apply(RuleEvent::Validate).unwrap();
        fsm.apply(RuleEvent::Compile).unwrap();
        fsm.apply(RuleEvent::Persist).unwrap();
        for _ in 0..(TRANSITION_AUDIT_CAPACITY * 2) {
            fsm.apply(RuleEvent::Update).unwrap();
            fsm.apply(RuleEvent::UpdateComplete).unwrap();
        }
        assert_eq!(fsm.history().len(), TRANSITION_AUDIT_CAPACITY);
    }

    #[test]
    fn registry_get_does_not_allocate() {
        let registry = FsmRegistry::new();
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.entries.len(), 0);
    }

    #[test]
    fn registry_get_or_create_is_idempotent() {
        let registry = FsmRegistry::new();
        let a = registry.get_or_create("r1");
        let b = registry.get_or_create("r1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[rstest::rstest]
    #[case(RuleState::Absent, RuleEvent::Create, Some(RuleState::Draft))]
    #[case(RuleState::Draft, RuleEvent::Validate, Some(RuleState::Validated))]
    #[case(RuleState::Draft, RuleEvent::ValidationFailed, Some(RuleState::Failed))]
    #[case(RuleState::Draft, RuleEvent::Delete, None)]
    #[case(RuleState::Validated, RuleEvent::Compile, Some(RuleState::Compiled))]
    #[case(RuleState::Validated, RuleEvent::CompilationFailed, Some(RuleState::Failed))]
    #[case(RuleState::Compiled, RuleEvent::Persist, Some(RuleState::Persisted))]
    #[case(RuleState::Compiled, RuleEvent::PersistenceFailed, Some(RuleState::Failed))]
    #[case(RuleState::Persisted, RuleEvent::Update, Some(RuleState::Updating))]
    #[case(RuleState::Persisted, RuleEvent::Delete, Some(RuleState::Deleting))]
    #[case(RuleState::Persisted, RuleEvent::Create, None)]
    #[case(RuleState::Updating, RuleEvent::UpdateComplete, Some(RuleState::Persisted))]
    #[case(RuleState::Updating, RuleEvent::UpdateFailed, Some(RuleState::Persisted))]
    #[case(RuleState::Updating, RuleEvent::Delete, None)]
    #[case(RuleState::Deleting, RuleEvent::DeleteComplete, Some(RuleState::Absent))]
    #[case(RuleState::Deleting, RuleEvent::DeleteFailed, Some(RuleState::Persisted))]
    #[case(RuleState::Deleting, RuleEvent::Update, None)]
    #[case(RuleState::Failed, RuleEvent::Rollback, Some(RuleState::Persisted))]
    #[case(RuleState::Failed, RuleEvent::Create, None)]
    #[case(RuleState::Absent, RuleEvent::Update, None)]
    fn transition_table_matches_expected(
        #[case] from: RuleState,
        #[case] event: RuleEvent,
        #[case] expected: Option<RuleState>,
    ) {
        assert_eq!(next_state(from, event), expected);
    }
}

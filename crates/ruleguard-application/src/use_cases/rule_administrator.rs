//! The rule administrator: five-phase Create/Update/Delete/Enable/Disable
//! protocols that keep the FSM registry, the compiled rule engine, and the
//! durable rule store consistent under partial failure.

use std::sync::Arc;

use ruleguard_domain::entities::{NewRule, Rule, RuleEdit};
use ruleguard_domain::error::{Error, Result};
use ruleguard_domain::fsm::{FsmRegistry, RuleEvent, RuleState};
use ruleguard_domain::ports::{RuleEngine, RuleFilter, RuleStore};

/// Orchestrates rule lifecycle changes. Holds no state of its own beyond
/// references to the registry and the two adapters it coordinates.
pub struct RuleAdministrator {
    registry: Arc<FsmRegistry>,
    store: Arc<dyn RuleStore>,
    engine: Arc<dyn RuleEngine>,
}

impl RuleAdministrator {
    /// Construct an administrator over the given registry, store, and
    /// engine.
    #[must_use]
    pub fn new(registry: Arc<FsmRegistry>, store: Arc<dyn RuleStore>, engine: Arc<dyn RuleEngine>) -> Self {
        Self {
            registry,
            store,
            engine,
        }
    }

    /// Phase protocol: Draft -> Validated -> Compiled -> Persisted.
    ///
    /// Any phase failure drives the FSM to `Failed` and returns the
    /// triggering error; earlier phases are not rolled back since nothing
    /// external was mutated until `Persist`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if `input.name` already has a live
    /// FSM entry, [`Error::InvalidArgument`] if validation or compilation
    /// fails, or the store's error if persistence fails.
    pub async fn create(&self, input: NewRule) -> Result<Rule> {
        let rule_id = input.name.clone();
        let fsm = self.registry.get_or_create(&rule_id);

        if fsm.state() != RuleState::Absent {
            return Err(Error::already_exists(rule_id));
        }
        fsm.apply(RuleEvent::Create)?;

        let rule = Rule::new(input);
        if let Err(err) = rule.validate() {
            fsm.apply(RuleEvent::ValidationFailed)?;
            return Err(err);
        }
        fsm.apply(RuleEvent::Validate)?;

        if let Err(err) = self.engine.load(&rule).await {
            fsm.apply(RuleEvent::CompilationFailed)?;
            return Err(err);
        }
        fsm.apply(RuleEvent::Compile)?;

        if let Err(err) = self.store.create(&rule).await {
            self.engine.unload(&rule.id).await;
            fsm.apply(RuleEvent::PersistenceFailed)?;
            return Err(err);
        }
        fsm.apply(RuleEvent::Persist)?;

        Ok(rule)
    }

    /// Phase protocol: Persisted -> Updating -> (validate, recompile,
    /// repersist) -> Persisted.
    ///
    /// On failure the previously compiled rule is reloaded into the engine
    /// so the engine and store agree, and the FSM returns to `Persisted`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the rule has no live FSM entry or is
    /// not currently `Persisted`, or the validation/compile/store error
    /// otherwise.
    pub async fn update(&self, id: &str, edit: RuleEdit) -> Result<Rule> {
        let fsm = self
            .registry
            .get(id)
            .ok_or_else(|| Error::not_found(format!("rule:{id}")))?;
        if fsm.state() != RuleState::Persisted {
            return Err(Error::failed_precondition(format!(
                "rule {id} is not in a state that accepts Update"
            )));
        }
        fsm.apply(RuleEvent::Update)?;

        let Some(previous) = self.engine.get(id).await else {
            fsm.apply(RuleEvent::UpdateFailed)?;
            return Err(Error::not_found(format!("rule:{id}")));
        };
        let updated = previous.with_edit(edit);

        if let Err(err) = updated.validate() {
            fsm.apply(RuleEvent::UpdateFailed)?;
            return Err(err);
        }

        if let Err(err) = self.engine.load(&updated).await {
            fsm.apply(RuleEvent::UpdateFailed)?;
            return Err(err);
        }

        if let Err(err) = self.store.update(&updated).await {
            // Engine now disagrees with the store; reload the previous rule
            // so they stay consistent.
            let _ = self.engine.load(&previous).await;
            fsm.apply(RuleEvent::UpdateFailed)?;
            return Err(err);
        }

        fsm.apply(RuleEvent::UpdateComplete)?;
        Ok(updated)
    }

    /// Phase protocol: Persisted -> Deleting -> (store delete, engine
    /// unload) -> Absent, with the FSM entry removed from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the rule has no live FSM entry or is
    /// not currently `Persisted`, or the store's error if deletion fails.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let fsm = self
            .registry
            .get(id)
            .ok_or_else(|| Error::not_found(format!("rule:{id}")))?;
        if fsm.state() != RuleState::Persisted {
            return Err(Error::failed_precondition(format!(
                "rule {id} is not in a state that accepts Delete"
            )));
        }
        fsm.apply(RuleEvent::Delete)?;

        if let Err(err) = self.store.delete(id).await {
            fsm.apply(RuleEvent::DeleteFailed)?;
            return Err(err);
        }
        self.engine.unload(id).await;
        fsm.apply(RuleEvent::DeleteComplete)?;
        self.registry.remove(id);
        Ok(())
    }

    /// Phase protocol for Enable/Disable: Persisted -> Updating -> (flip
    /// `enabled`, persist, then flip the engine's flag) -> Persisted.
    ///
    /// The rule stays compiled in the engine the whole time; only its
    /// `enabled` flag moves, so this never pays for a recompile. Persist
    /// happens *before* the engine is told, matching the disk-leads-engine
    /// asymmetry: if the engine update fails after the store succeeded, the
    /// store is not rolled back — a restart reloads the engine from disk
    /// and the two reconverge. The converse (disk lagging the engine) would
    /// lose data and is never allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the rule has no live FSM entry, is not
    /// currently `Persisted`, or has no compiled entry in the engine, or
    /// the store's error if persistence fails.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Rule> {
        let fsm = self
            .registry
            .get(id)
            .ok_or_else(|| Error::not_found(format!("rule:{id}")))?;
        if fsm.state() != RuleState::Persisted {
            return Err(Error::failed_precondition(format!(
                "rule {id} is not in a state that accepts Enable/Disable"
            )));
        }
        fsm.apply(RuleEvent::Update)?;

        let Some(previous) = self.engine.get(id).await else {
            fsm.apply(RuleEvent::UpdateFailed)?;
            return Err(Error::not_found(format!("rule:{id}")));
        };
        let updated = previous.with_enabled(enabled);

        if let Err(err) = self.store.update(&updated).await {
            fsm.apply(RuleEvent::UpdateFailed)?;
            return Err(err);
        }

        self.engine.set_enabled(id, enabled).await;

        fsm.apply(RuleEvent::UpdateComplete)?;
        Ok(updated)
    }

    /// Fetch a single rule along with its current lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the rule does not exist in the store.
    pub async fn get(&self, id: &str) -> Result<(Rule, RuleState)> {
        let rule = self.store.get(id).await?;
        let state = self.registry.get(id).map_or(RuleState::Absent, |fsm| fsm.state());
        Ok((rule, state))
    }

    /// List rules matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if listing fails.
    pub async fn list(&self, filter: &RuleFilter) -> Result<Vec<Rule>> {
        self.store.list(filter).await
    }
}

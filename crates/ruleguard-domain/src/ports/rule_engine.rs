//! In-memory compiled rule catalog and evaluation (C2).

use async_trait::async_trait;

use crate::entities::{Rule, Span, TraceSlot};
use crate::error::Result;

/// A single rule match produced by evaluation, prior to being recorded as a
/// [`crate::entities::Violation`].
#[derive(Debug, Clone)]
pub struct Match {
    /// The rule that matched.
    pub rule_id: String,
    /// The rule's name at match time (equal to `rule_id` today, carried
    /// separately since the data model distinguishes the two fields).
    pub rule_name: String,
    /// Severity copied from the rule at evaluation time.
    pub severity: String,
    /// Human-readable description of what matched, derived from the rule's
    /// own description when it has one.
    pub message: String,
    /// Context captured for diagnostics.
    pub context: serde_json::Value,
}

/// The compiled-rule evaluation engine. Loading/unloading rules here is
/// separate from the durable catalog in [`super::rule_store::RuleStore`]:
/// a rule can be persisted without (yet) being compiled, and vice versa
/// during rollback.
///
/// A disabled rule stays compiled and present (`is_loaded`/`get`/`list`
/// still see it) but is skipped by `evaluate_one`/`evaluate_trace` — this
/// is what keeps Enable/Disable O(1) without a recompile.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Compile `rule.expression` and make it available for evaluation.
    /// Overwrites any existing compiled entry for `rule.id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::InvalidArgument`] if the expression
    /// fails to compile.
    async fn load(&self, rule: &Rule) -> Result<()>;

    /// Remove a compiled rule by id. A no-op, not an error, if absent.
    async fn unload(&self, id: &str);

    /// Flip the `enabled` flag of an already-loaded rule without touching
    /// its compiled form. A no-op if `id` has no compiled entry.
    async fn set_enabled(&self, id: &str, enabled: bool);

    /// `true` if `id` currently has a compiled entry (regardless of its
    /// `enabled` flag).
    async fn is_loaded(&self, id: &str) -> bool;

    /// Fetch the rule data currently held by the engine for `id`, or
    /// `None` if it has no compiled entry.
    async fn get(&self, id: &str) -> Option<Rule>;

    /// List ids currently compiled.
    async fn loaded_ids(&self) -> Vec<String>;

    /// List rule data currently held by the engine.
    async fn list(&self) -> Vec<Rule>;

    /// Evaluate every enabled, loaded span-scope rule against a single span.
    async fn evaluate_one(&self, span: &Span) -> Vec<Match>;

    /// Evaluate every enabled, loaded trace-scope rule against a completed
    /// trace.
    async fn evaluate_trace(&self, trace_id: &str, trace: &TraceSlot) -> Vec<Match>;
}

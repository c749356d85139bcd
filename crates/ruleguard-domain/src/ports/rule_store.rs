//! Durable catalog of rule definitions (C1).

use async_trait::async_trait;

use crate::entities::Rule;
use crate::error::Result;

/// Filter accepted by [`RuleStore::list`].
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    /// Restrict to enabled rules only.
    pub enabled_only: bool,
    /// Restrict to a single severity label.
    pub severity: Option<String>,
    /// Restrict to rules carrying at least one of these tags.
    pub tags: Vec<String>,
}

/// The durable rule catalog. Implementations must make each mutating call
/// atomic: durable iff it returns `Ok`, unchanged iff it returns `Err`.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Persist a new rule. Fails with [`crate::error::Error::AlreadyExists`]
    /// if `rule.id` is already present.
    async fn create(&self, rule: &Rule) -> Result<()>;

    /// Overwrite an existing rule. Fails with
    /// [`crate::error::Error::NotFound`] if `rule.id` is absent.
    async fn update(&self, rule: &Rule) -> Result<()>;

    /// Remove a rule by id. Fails with [`crate::error::Error::NotFound`] if
    /// absent.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Fetch a single rule by id.
    async fn get(&self, id: &str) -> Result<Rule>;

    /// List rules matching `filter`. Rows that fail to deserialize are
    /// skipped, not surfaced as an error for the whole call.
    async fn list(&self, filter: &RuleFilter) -> Result<Vec<Rule>>;
}

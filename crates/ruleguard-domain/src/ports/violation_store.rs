//! Append-only record of rule matches (C7).

use async_trait::async_trait;

use crate::entities::{NewViolation, Violation, ViolationQuery};
use crate::error::Result;

/// The violation store. Weaker durability requirements than
/// [`super::rule_store::RuleStore`]: an in-process implementation is
/// acceptable.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    /// Record a new violation, assigning it an id and timestamp.
    async fn record(&self, violation: NewViolation) -> Result<Violation>;

    /// Query recorded violations, newest first.
    async fn query(&self, query: &ViolationQuery) -> Result<Vec<Violation>>;
}

//! Durable and in-process storage adapters.

pub mod rule_store;
pub mod violation_store;

pub use rule_store::SqliteRuleStore;
pub use violation_store::InMemoryViolationStore;

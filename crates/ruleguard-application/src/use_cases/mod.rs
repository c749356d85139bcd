//! Application use cases: orchestration that spans multiple domain ports.

pub mod ingest_coordinator;
pub mod rule_administrator;

pub use ingest_coordinator::{IngestCoordinator, IngestSummary};
pub use rule_administrator::RuleAdministrator;

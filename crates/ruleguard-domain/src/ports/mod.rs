//! Port traits: the seams infrastructure and providers adapters implement.

pub mod rule_engine;
pub mod rule_store;
pub mod trace_buffer;
pub mod violation_store;

pub use rule_engine::{Match, RuleEngine};
pub use rule_store::{RuleFilter, RuleStore};
pub use trace_buffer::{TraceBuffer, TraceSink};
pub use violation_store::ViolationStore;

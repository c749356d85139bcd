//! Domain entities: rules, spans, violations, and trace accumulation slots.

pub mod rule;
pub mod span;
pub mod trace;
pub mod violation;

pub use rule::{NewRule, Rule, RuleEdit};
pub use span::{Span, SpanStatus};
pub use trace::TraceSlot;
pub use violation::{NewViolation, SpanRef, Violation, ViolationQuery};

//! The `Violation` entity: a recorded match of a rule against a span or
//! trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal pointer back to the span (and trace) that triggered a violation,
/// without duplicating the full span payload into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRef {
    /// Trace the matched span belongs to.
    pub trace_id: String,
    /// The matched span's id, `None` for trace-scope matches with no single
    /// triggering span.
    pub span_id: Option<String>,
    /// Service that produced the matched span.
    pub service_name: String,
}

/// A single rule-match event. Links to one or more [`SpanRef`]s: a
/// span-scope match links to the one span that triggered it; a
/// trace-scope match links to every span in the completed trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Generated identifier, unique within this store.
    pub id: String,
    /// The rule that matched.
    pub rule_id: String,
    /// The rule's name at match time.
    pub rule_name: String,
    /// Severity copied from the rule at evaluation time.
    pub severity: String,
    /// Human-readable description of what matched.
    pub message: String,
    /// Pointers to the span(s) that triggered the match.
    pub span_refs: Vec<SpanRef>,
    /// When the match was recorded.
    pub detected_at: DateTime<Utc>,
    /// Free-form context captured from the evaluated span/trace, for
    /// diagnostics (e.g. the field values that drove the match).
    pub context: serde_json::Value,
}

/// Input accepted by `ViolationStore::record`.
#[derive(Debug, Clone)]
pub struct NewViolation {
    /// The rule that matched.
    pub rule_id: String,
    /// The rule's name at match time.
    pub rule_name: String,
    /// Severity copied from the rule at evaluation time.
    pub severity: String,
    /// Human-readable description of what matched.
    pub message: String,
    /// Pointers to the span(s) that triggered the match.
    pub span_refs: Vec<SpanRef>,
    /// Free-form context captured from the evaluated span/trace.
    pub context: serde_json::Value,
}

/// Filter accepted by `ViolationStore::query`.
#[derive(Debug, Clone, Default)]
pub struct ViolationQuery {
    /// Restrict to violations of this rule.
    pub rule_id: Option<String>,
    /// Restrict to violations of this trace.
    pub trace_id: Option<String>,
    /// Restrict to violations detected at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of results; `0` means the store's default limit.
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_has_no_filters() {
        let query = ViolationQuery::default();
        assert!(query.rule_id.is_none());
        assert!(query.trace_id.is_none());
        assert_eq!(query.limit, 0);
    }
}

//! In-process append-only violation store (C7).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use ruleguard_domain::constants::DEFAULT_VIOLATION_QUERY_LIMIT;
use ruleguard_domain::entities::{NewViolation, Violation, ViolationQuery};
use ruleguard_domain::error::Result;
use ruleguard_domain::ports::ViolationStore;

/// A [`ViolationStore`] backed by a `DashMap`, with insertion order tracked
/// by a monotonic sequence number so `query` can return newest-first.
#[derive(Default)]
pub struct InMemoryViolationStore {
    entries: DashMap<u64, Violation>,
    sequence: AtomicU64,
}

impl InMemoryViolationStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViolationStore for InMemoryViolationStore {
    async fn record(&self, violation: NewViolation) -> Result<Violation> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let recorded = Violation {
            id: format!("v-{seq}"),
            rule_id: violation.rule_id,
            rule_name: violation.rule_name,
            severity: violation.severity,
            message: violation.message,
            span_refs: violation.span_refs,
            detected_at: Utc::now(),
            context: violation.context,
        };
        self.entries.insert(seq, recorded.clone());
        Ok(recorded)
    }

    async fn query(&self, query: &ViolationQuery) -> Result<Vec<Violation>> {
        let limit = if query.limit == 0 {
            DEFAULT_VIOLATION_QUERY_LIMIT
        } else {
            query.limit
        };

        let mut seqs: Vec<u64> = self.entries.iter().map(|entry| *entry.key()).collect();
        seqs.sort_unstable_by(|a, b| b.cmp(a));

        let mut results = Vec::with_capacity(limit.min(seqs.len()));
        for seq in seqs {
            if results.len() == limit {
                break;
            }
            let Some(entry) = self.entries.get(&seq) else {
                continue;
            };
            let violation = entry.value();
            if let Some(rule_id) = &query.rule_id
                && &violation.rule_id != rule_id
            {
                continue;
            }
            if let Some(trace_id) = &query.trace_id
                && !violation.span_refs.iter().any(|span_ref| &span_ref.trace_id == trace_id)
            {
                continue;
            }
            if let Some(since) = query.since
                && violation.detected_at < since
            {
                continue;
            }
            results.push(violation.clone());
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruleguard_domain::entities::SpanRef;

    fn violation(rule_id: &str, trace_id: &str) -> NewViolation {
        NewViolation {
            rule_id: rule_id.to_owned(),
            rule_name: rule_id.to_owned(),
            severity: "warning".to_owned(),
            message: "matched".to_owned(),
            span_refs: vec![SpanRef {
                trace_id: trace_id.to_owned(),
                span_id: Some("s1".to_owned()),
                service_name: "svc".to_owned(),
            }],
            context: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn record_assigns_unique_ids() {
        let store = InMemoryViolationStore::new();
        let a = store.record(violation("r1", "t1")).await.unwrap();
        let b = store.record(violation("r1", "t1")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn query_returns_newest_first() {
        let store = InMemoryViolationStore::new();
        let first = store.record(violation("r1", "t1")).await.unwrap();
        let second = store.record(violation("r1", "t1")).await.unwrap();
        let results = store.query(&ViolationQuery::default()).await.unwrap();
        assert_eq!(results[0].id, second.id);
        assert_eq!(results[1].id, first.id);
    }

    #[tokio::test]
    async fn query_filters_by_rule_id() {
        let store = InMemoryViolationStore::new();
        store.record(violation("r1", "t1")).await.unwrap();
        store.record(violation("r2", "t1")).await.unwrap();
        let results = store
            .query(&ViolationQuery {
                rule_id: Some("r1".to_owned()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id, "r1");
    }
}

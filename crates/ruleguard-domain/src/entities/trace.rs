//! The `TraceSlot` entity: the in-progress accumulation of spans belonging
//! to one trace, held by the trace buffer until it idles out.

use chrono::{DateTime, Utc};

use super::span::Span;

/// Spans collected so far for a single trace, plus bookkeeping used by the
/// idle-flush scheduler.
#[derive(Debug, Clone, Default)]
pub struct TraceSlot {
    /// Spans observed for this trace, in arrival order.
    pub spans: Vec<Span>,
    /// Timestamp of the most recently appended span.
    pub last_activity: Option<DateTime<Utc>>,
}

impl TraceSlot {
    /// Append a span and refresh `last_activity`.
    pub fn push(&mut self, span: Span) {
        self.last_activity = Some(Utc::now());
        self.spans.push(span);
    }

    /// `true` once `last_activity` is older than `window`.
    #[must_use]
    pub fn is_idle(&self, window: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.last_activity {
            Some(last) => now - last > window,
            None => false,
        }
    }

    /// Total span count, for trace-scope rule evaluation.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Wall-clock span of the trace: earliest `start_time` to latest
    /// `end_time`, in milliseconds. `0` if empty.
    #[must_use]
    pub fn duration_millis(&self) -> i64 {
        let Some(start) = self.spans.iter().map(|s| s.start_time).min() else {
            return 0;
        };
        let Some(end) = self.spans.iter().map(|s| s.end_time).max() else {
            return 0;
        };
        (end - start).num_milliseconds().max(0)
    }

    /// Distinct service names observed in this trace.
    #[must_use]
    pub fn services(&self) -> Vec<String> {
        let mut services: Vec<String> = self
            .spans
            .iter()
            .map(|s| s.service_name.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        services.sort();
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::span::SpanStatus;
    use std::collections::BTreeMap;

    fn span(id: &str, service: &str, start_offset_ms: i64, dur_ms: i64) -> Span {
        let base = Utc::now();
        let start = base + chrono::Duration::milliseconds(start_offset_ms);
        Span {
            trace_id: "t1".to_owned(),
            span_id: id.to_owned(),
            parent_span_id: None,
            operation_name: "op".to_owned(),
            service_name: service.to_owned(),
            status: SpanStatus::Ok,
            start_time: start,
            end_time: start + chrono::Duration::milliseconds(dur_ms),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn is_idle_false_when_empty() {
        let slot = TraceSlot::default();
        assert!(!slot.is_idle(chrono::Duration::seconds(1), Utc::now()));
    }

    #[test]
    fn push_updates_last_activity() {
        let mut slot = TraceSlot::default();
        slot.push(span("s1", "svc-a", 0, 10));
        assert!(slot.last_activity.is_some());
        assert_eq!(slot.span_count(), 1);
    }

    #[test]
    fn services_are_deduped_and_sorted() {
        let mut slot = TraceSlot::default();
        slot.push(span("s1", "svc-b", 0, 10));
        slot.push(span("s2", "svc-a", 0, 10));
        slot.push(span("s3", "svc-a", 5, 10));
        assert_eq!(slot.services(), vec!["svc-a".to_owned(), "svc-b".to_owned()]);
    }

    #[test]
    fn duration_spans_earliest_start_to_latest_end() {
        let mut slot = TraceSlot::default();
        slot.push(span("s1", "svc-a", 0, 10));
        slot.push(span("s2", "svc-a", 5, 50));
        assert_eq!(slot.duration_millis(), 55);
    }
}

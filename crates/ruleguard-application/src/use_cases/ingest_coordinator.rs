//! The ingest coordinator: validates and normalizes incoming spans, feeds
//! the trace buffer, evaluates span-scope rules, and records violations.

use std::sync::Arc;

use ruleguard_domain::constants::{MAX_ATTRIBUTES_PER_SPAN, MAX_SPANS_PER_BATCH};
use ruleguard_domain::entities::{NewViolation, Span, SpanRef, TraceSlot};
use ruleguard_domain::error::{Error, Result};
use ruleguard_domain::ports::{Match, RuleEngine, TraceBuffer, TraceSink, ViolationStore};

/// Outcome of a single ingest call: how many spans were accepted and how
/// many violations they produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Number of spans accepted into the trace buffer.
    pub accepted: usize,
    /// Number of spans rejected for failing validation.
    pub rejected: usize,
    /// Number of violations recorded from span-scope evaluation.
    pub violations: usize,
}

/// Validates and routes incoming spans, and reacts to completed traces by
/// running trace-scope rule evaluation.
pub struct IngestCoordinator {
    engine: Arc<dyn RuleEngine>,
    buffer: Arc<dyn TraceBuffer>,
    violations: Arc<dyn ViolationStore>,
}

impl IngestCoordinator {
    /// Construct a coordinator over the given engine, trace buffer, and
    /// violation store.
    #[must_use]
    pub fn new(engine: Arc<dyn RuleEngine>, buffer: Arc<dyn TraceBuffer>, violations: Arc<dyn ViolationStore>) -> Self {
        Self {
            engine,
            buffer,
            violations,
        }
    }

    /// Ingest a batch of spans: validate every span, feed each to the trace
    /// buffer, evaluate span-scope rules, and record any matches.
    ///
    /// Validation is all-or-nothing: a single malformed span fails the
    /// whole batch before anything is buffered or evaluated, matching the
    /// batch's atomicity contract (`accepted + rejected == len(batch)` with
    /// `rejected` always `0` in the current design).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the batch exceeds
    /// `MAX_SPANS_PER_BATCH` or any span fails structural validation.
    pub async fn ingest_batch(&self, spans: Vec<Span>) -> Result<IngestSummary> {
        if spans.len() > MAX_SPANS_PER_BATCH {
            return Err(Error::invalid_argument(format!(
                "batch of {} spans exceeds limit of {MAX_SPANS_PER_BATCH}",
                spans.len()
            )));
        }
        for span in &spans {
            span.validate(MAX_ATTRIBUTES_PER_SPAN)?;
        }

        let mut summary = IngestSummary::default();
        for span in spans {
            summary.accepted += 1;

            let matches = self.engine.evaluate_one(&span).await;
            summary.violations += matches.len();
            for matched in matches {
                let span_ref = SpanRef {
                    trace_id: span.trace_id.clone(),
                    span_id: Some(span.span_id.clone()),
                    service_name: span.service_name.clone(),
                };
                self.record(matched, vec![span_ref]).await;
            }

            if let Err(err) = self.buffer.ingest(span).await {
                tracing::warn!(error = %err, "failed to buffer span after evaluation");
            }
        }
        Ok(summary)
    }

    async fn record(&self, matched: Match, span_refs: Vec<SpanRef>) {
        let result = self
            .violations
            .record(NewViolation {
                rule_id: matched.rule_id,
                rule_name: matched.rule_name,
                severity: matched.severity,
                message: matched.message,
                span_refs,
                context: matched.context,
            })
            .await;
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to record violation");
        }
    }
}

#[async_trait::async_trait]
impl TraceSink for IngestCoordinator {
    async fn on_trace_complete(&self, trace_id: String, trace: TraceSlot) {
        let matches = self.engine.evaluate_trace(&trace_id, &trace).await;
        if matches.is_empty() {
            return;
        }
        let span_refs: Vec<SpanRef> = trace
            .spans
            .iter()
            .map(|span| SpanRef {
                trace_id: trace_id.clone(),
                span_id: Some(span.span_id.clone()),
                service_name: span.service_name.clone(),
            })
            .collect();
        for matched in matches {
            self.record(matched, span_refs.clone()).await;
        }
    }
}

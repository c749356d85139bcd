//! Trace assembly and idle-flush scheduling (C5).

use async_trait::async_trait;

use crate::entities::{Span, TraceSlot};
use crate::error::Result;

/// Receives a trace once its idle window elapses. Implemented by the
/// ingest coordinator so completed traces feed trace-scope rule evaluation.
#[async_trait]
pub trait TraceSink: Send + Sync {
    /// Called once per flushed trace with its final, detached span set.
    async fn on_trace_complete(&self, trace_id: String, trace: TraceSlot);
}

/// Accumulates spans into per-trace slots and flushes idle traces to a
/// [`TraceSink`] on a background schedule.
#[async_trait]
pub trait TraceBuffer: Send + Sync {
    /// Append a span to its trace's slot, creating the slot if needed.
    async fn ingest(&self, span: Span) -> Result<()>;

    /// Number of traces currently buffered (not yet flushed).
    async fn active_trace_count(&self) -> usize;

    /// Stop the background flush scheduler, performing one final full
    /// drain of all remaining slots before returning.
    async fn stop(&self);
}

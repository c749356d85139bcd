//! Default numeric limits for rules, spans, batches, and queries.

use std::time::Duration;

/// Maximum byte length of a rule's `expression` field.
pub const MAX_EXPRESSION_LENGTH: usize = 65_536;

/// Maximum byte length of a rule's `description` field.
pub const MAX_DESCRIPTION_LENGTH: usize = 4_096;

/// Maximum byte length of a rule's `id`/`name` field.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum number of attribute entries on a single span.
pub const MAX_ATTRIBUTES_PER_SPAN: usize = 128;

/// Maximum number of spans accepted in a single ingest batch.
pub const MAX_SPANS_PER_BATCH: usize = 10_000;

/// Default duration of inactivity after which a trace is flushed.
pub const TRACE_IDLE_WINDOW: Duration = Duration::from_secs(3);

/// Default page size applied to violation queries when the caller passes zero.
pub const DEFAULT_VIOLATION_QUERY_LIMIT: usize = 100;

/// Prefix marking a rule expression as trace-scope rather than span-scope.
pub const TRACE_SCOPE_PREFIX: &str = "trace:";

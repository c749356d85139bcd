//! The `Span` entity: a single unit of tracing data ingested by the
//! coordinator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Outcome of the operation a span represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// The operation completed without error.
    Ok,
    /// The operation failed.
    Error,
    /// No status was reported.
    Unset,
}

impl std::fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Unset => "unset",
        };
        f.write_str(text)
    }
}

/// A single ingested tracing span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Identifier of the trace this span belongs to.
    pub trace_id: String,
    /// Identifier of this span, unique within its trace.
    pub span_id: String,
    /// Identifier of the parent span, if any.
    pub parent_span_id: Option<String>,
    /// Name of the operation this span represents.
    pub operation_name: String,
    /// Name of the service that produced this span.
    pub service_name: String,
    /// Outcome status of the operation.
    pub status: SpanStatus,
    /// Wall-clock start time.
    pub start_time: DateTime<Utc>,
    /// Wall-clock end time.
    pub end_time: DateTime<Utc>,
    /// Free-form key/value attributes.
    pub attributes: BTreeMap<String, String>,
}

impl Span {
    /// Duration between `start_time` and `end_time`, in milliseconds.
    ///
    /// Negative spans (malformed input where `end_time < start_time`) report
    /// `0` rather than a negative duration; callers should reject such spans
    /// during normalization instead of relying on this clamp.
    #[must_use]
    pub fn duration_millis(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds().max(0)
    }

    /// Validate structural invariants enforced at ingest time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `trace_id`, `span_id`, or
    /// `operation_name` is empty, or the span has too many attributes.
    pub fn validate(&self, max_attributes: usize) -> Result<()> {
        if self.trace_id.is_empty() {
            return Err(Error::invalid_argument("span trace_id must not be empty"));
        }
        if self.span_id.is_empty() {
            return Err(Error::invalid_argument("span span_id must not be empty"));
        }
        if self.operation_name.is_empty() {
            return Err(Error::invalid_argument("span operation_name must not be empty"));
        }
        if self.attributes.len() > max_attributes {
            return Err(Error::invalid_argument(format!(
                "span {} has {} attributes, exceeds limit of {max_attributes}",
                self.span_id,
                self.attributes.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Span {
        let start = Utc::now();
        Span {
            trace_id: "trace-1".to_owned(),
            span_id: "span-1".to_owned(),
            parent_span_id: None,
            operation_name: "GET /users".to_owned(),
            service_name: "users-api".to_owned(),
            status: SpanStatus::Ok,
            start_time: start,
            end_time: start + Duration::milliseconds(150),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn duration_millis_is_nonnegative() {
        let span = sample();
        assert_eq!(span.duration_millis(), 150);
    }

    #[test]
    fn validate_rejects_empty_trace_id() {
        let mut span = sample();
        span.trace_id.clear();
        assert!(span.validate(128).is_err());
    }

    #[test]
    fn duration_millis_clamps_negative_span_to_zero() {
        let mut span = sample();
        span.end_time = span.start_time - Duration::milliseconds(1);
        assert_eq!(span.duration_millis(), 0);
    }

    #[test]
    fn validate_accepts_empty_service_name() {
        let mut span = sample();
        span.service_name.clear();
        assert!(span.validate(128).is_ok());
    }

    #[test]
    fn validate_rejects_too_many_attributes() {
        let mut span = sample();
        span.attributes.insert("k".to_owned(), "v".to_owned());
        assert!(span.validate(0).is_err());
    }
}

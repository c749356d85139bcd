//! The `Rule` entity: a uniquely-identified declarative pattern evaluated
//! against spans and traces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_DESCRIPTION_LENGTH, MAX_EXPRESSION_LENGTH, MAX_NAME_LENGTH};
use crate::error::{Error, Result};

/// A declarative rule definition.
///
/// `id` equals `name` at creation time and is immutable thereafter (see
/// `RuleAdministrator::create`); there is no rename operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier, equal to `name` on creation.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Free-text severity label (e.g. `"critical"`, `"warning"`).
    pub severity: String,
    /// Free-text tags used for filtering.
    pub tags: Vec<String>,
    /// Opaque expression source, compiled by the rule engine.
    pub expression: String,
    /// Whether the rule currently participates in evaluation.
    pub enabled: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Monotonic edit counter, bumped on every successful Update/Enable/Disable.
    ///
    /// Additive lifecycle metadata, not rule content history: rolling this
    /// counter forward never reconstructs a past `expression`.
    pub version: u64,
}

/// Input fields accepted by `RuleAdministrator::create`.
#[derive(Debug, Clone)]
pub struct NewRule {
    /// Name of the rule; becomes its `id`.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Opaque expression source.
    pub expression: String,
    /// Whether the rule starts enabled.
    pub enabled: bool,
    /// Free-text severity label.
    pub severity: String,
    /// Free-text tags.
    pub tags: Vec<String>,
}

/// Input fields accepted by `RuleAdministrator::update`. Any `None` field
/// keeps the existing value.
#[derive(Debug, Clone, Default)]
pub struct RuleEdit {
    /// Replacement description, if provided.
    pub description: Option<String>,
    /// Replacement expression, if provided.
    pub expression: Option<String>,
    /// Replacement severity, if provided.
    pub severity: Option<String>,
    /// Replacement tags, if provided.
    pub tags: Option<Vec<String>>,
}

impl Rule {
    /// Construct a new rule in its initial, unpersisted form.
    #[must_use]
    pub fn new(id: NewRule) -> Self {
        let now = Utc::now();
        Self {
            id: id.name.clone(),
            name: id.name,
            description: id.description,
            severity: id.severity,
            tags: id.tags,
            expression: id.expression,
            enabled: id.enabled,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Apply an edit, refreshing `updated_at` and incrementing `version`.
    #[must_use]
    pub fn with_edit(&self, edit: RuleEdit) -> Self {
        let mut next = self.clone();
        if let Some(description) = edit.description {
            next.description = description;
        }
        if let Some(expression) = edit.expression {
            next.expression = expression;
        }
        if let Some(severity) = edit.severity {
            next.severity = severity;
        }
        if let Some(tags) = edit.tags {
            next.tags = tags;
        }
        next.updated_at = Utc::now();
        next.version += 1;
        next
    }

    /// Return a copy with `enabled` flipped and bookkeeping fields refreshed.
    #[must_use]
    pub fn with_enabled(&self, enabled: bool) -> Self {
        let mut next = self.clone();
        next.enabled = enabled;
        next.updated_at = Utc::now();
        next.version += 1;
        next
    }

    /// Validate field-length invariants (`§3 Invariants`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any limit is exceeded or the id
    /// or expression is empty.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.id.len() > MAX_NAME_LENGTH {
            return Err(Error::invalid_argument(format!(
                "rule id length must be in [1,{MAX_NAME_LENGTH}], got {}",
                self.id.len()
            )));
        }
        if self.expression.is_empty() || self.expression.len() > MAX_EXPRESSION_LENGTH {
            return Err(Error::invalid_argument(format!(
                "rule expression length must be in [1,{MAX_EXPRESSION_LENGTH}], got {}",
                self.expression.len()
            )));
        }
        if self.description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(Error::invalid_argument(format!(
                "rule description length must be <= {MAX_DESCRIPTION_LENGTH}, got {}",
                self.description.len()
            )));
        }
        Ok(())
    }

    /// Filter predicate used by `ListRules`.
    #[must_use]
    pub fn matches_filter(&self, enabled_only: bool, severity: Option<&str>, tags: &[String]) -> bool {
        if enabled_only && !self.enabled {
            return false;
        }
        if let Some(severity) = severity
            && self.severity != severity
        {
            return false;
        }
        if !tags.is_empty() && !tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Rule {
        Rule::new(NewRule {
            name: "slow-span".to_owned(),
            description: "flags slow spans".to_owned(),
            expression: "span.duration > 100".to_owned(),
            enabled: true,
            severity: "warning".to_owned(),
            tags: vec!["latency".to_owned()],
        })
    }

    #[test]
    fn id_equals_name_on_creation() {
        let rule = sample();
        assert_eq!(rule.id, rule.name);
    }

    #[test]
    fn validate_rejects_empty_expression() {
        let mut rule = sample();
        rule.expression.clear();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_name() {
        let mut rule = sample();
        rule.id = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn with_edit_bumps_version_and_timestamp() {
        let rule = sample();
        let edited = rule.with_edit(RuleEdit {
            expression: Some("span.duration > 200".to_owned()),
            ..Default::default()
        });
        assert_eq!(edited.version, 1);
        assert_eq!(edited.expression, "span.duration > 200");
        assert!(edited.updated_at >= rule.updated_at);
    }

    #[test]
    fn matches_filter_by_tag() {
        let rule = sample();
        assert!(rule.matches_filter(false, None, &["latency".to_owned()]));
        assert!(!rule.matches_filter(false, None, &["other".to_owned()]));
    }

    #[test]
    fn matches_filter_excludes_disabled_when_enabled_only() {
        let mut rule = sample();
        rule.enabled = false;
        assert!(!rule.matches_filter(true, None, &[]));
    }

    #[rstest::rstest]
    #[case::empty_id("", "span.duration > 1", false)]
    #[case::oversized_id(&"x".repeat(MAX_NAME_LENGTH + 1), "span.duration > 1", false)]
    #[case::max_id(&"x".repeat(MAX_NAME_LENGTH), "span.duration > 1", true)]
    #[case::empty_expression("rule", "", false)]
    #[case::oversized_expression("rule", &"x".repeat(MAX_EXPRESSION_LENGTH + 1), false)]
    #[case::ok("rule", "span.duration > 1", true)]
    fn validate_enforces_id_and_expression_bounds(#[case] id: &str, #[case] expression: &str, #[case] valid: bool) {
        let mut rule = sample();
        rule.id = id.to_owned();
        rule.expression = expression.to_owned();
        assert_eq!(rule.validate().is_ok(), valid);
    }

    #[rstest::rstest]
    #[case(MAX_DESCRIPTION_LENGTH, true)]
    #[case(MAX_DESCRIPTION_LENGTH + 1, false)]
    fn validate_enforces_description_bound(#[case] length: usize, #[case] valid: bool) {
        let mut rule = sample();
        rule.description = "x".repeat(length);
        assert_eq!(rule.validate().is_ok(), valid);
    }
}

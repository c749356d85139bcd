//! `evalexpr`-backed compiled rule engine (C2).

use async_trait::async_trait;
use dashmap::DashMap;
use evalexpr::{build_operator_tree, ContextWithMutableVariables, HashMapContext, Node, Value};

use ruleguard_domain::constants::TRACE_SCOPE_PREFIX;
use ruleguard_domain::entities::{Rule, Span, TraceSlot};
use ruleguard_domain::error::{Error, Result};
use ruleguard_domain::ports::{Match, RuleEngine};

/// A rule's expression once compiled, plus the metadata evaluation needs.
struct CompiledRule {
    rule: Rule,
    /// `true` if the expression carries the `trace:` scope prefix.
    trace_scope: bool,
    node: Node,
}

/// A [`RuleEngine`] that compiles each rule's expression with `evalexpr`
/// and evaluates it against a context built from span or trace fields.
#[derive(Default)]
pub struct EvalexprRuleEngine {
    compiled: DashMap<String, CompiledRule>,
}

impl EvalexprRuleEngine {
    /// Construct an engine with no compiled rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn span_context(span: &Span) -> HashMapContext {
        let mut context = HashMapContext::new();
        let _ = context.set_value("span.duration".into(), Value::Int(span.duration_millis()));
        let _ = context.set_value(
            "span.operation_name".into(),
            Value::String(span.operation_name.clone()),
        );
        let _ = context.set_value("span.service_name".into(), Value::String(span.service_name.clone()));
        let _ = context.set_value("span.status".into(), Value::String(span.status.to_string()));
        for (key, value) in &span.attributes {
            let _ = context.set_value(format!("span.attributes.{key}"), Value::String(value.clone()));
        }
        context
    }

    fn trace_context(trace: &TraceSlot) -> HashMapContext {
        let mut context = HashMapContext::new();
        let _ = context.set_value(
            "trace.span_count".into(),
            Value::Int(i64::try_from(trace.span_count()).unwrap_or(i64::MAX)),
        );
        let _ = context.set_value("trace.duration".into(), Value::Int(trace.duration_millis()));
        let _ = context.set_value(
            "trace.services".into(),
            Value::String(trace.services().join(",")),
        );
        context
    }

    fn evaluate(rule_id: &str, compiled: &CompiledRule, context: &HashMapContext) -> Option<Match> {
        match compiled.node.eval_boolean_with_context(context) {
            Ok(true) => Some(Match {
                rule_id: rule_id.to_owned(),
                rule_name: compiled.rule.name.clone(),
                severity: compiled.rule.severity.clone(),
                message: Self::match_message(&compiled.rule),
                context: serde_json::json!({}),
            }),
            Ok(false) => None,
            Err(err) => {
                tracing::warn!(rule_id, error = %err, "rule expression evaluation failed");
                None
            }
        }
    }

    fn match_message(rule: &Rule) -> String {
        if rule.description.is_empty() {
            format!("rule '{}' matched", rule.name)
        } else {
            rule.description.clone()
        }
    }
}

#[async_trait]
impl RuleEngine for EvalexprRuleEngine {
    async fn load(&self, rule: &Rule) -> Result<()> {
        let trace_scope = rule.expression.starts_with(TRACE_SCOPE_PREFIX);
        let source = if trace_scope {
            rule.expression
                .strip_prefix(TRACE_SCOPE_PREFIX)
                .unwrap_or(&rule.expression)
        } else {
            rule.expression.as_str()
        };
        let node = build_operator_tree(source).map_err(|err| Error::invalid_argument(err.to_string()))?;
        self.compiled.insert(
            rule.id.clone(),
            CompiledRule {
                rule: rule.clone(),
                trace_scope,
                node,
            },
        );
        Ok(())
    }

    async fn unload(&self, id: &str) {
        self.compiled.remove(id);
    }

    async fn set_enabled(&self, id: &str, enabled: bool) {
        if let Some(mut entry) = self.compiled.get_mut(id) {
            entry.rule.enabled = enabled;
        }
    }

    async fn is_loaded(&self, id: &str) -> bool {
        self.compiled.contains_key(id)
    }

    async fn get(&self, id: &str) -> Option<Rule> {
        self.compiled.get(id).map(|entry| entry.rule.clone())
    }

    async fn loaded_ids(&self) -> Vec<String> {
        self.compiled.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn list(&self) -> Vec<Rule> {
        self.compiled.iter().map(|entry| entry.value().rule.clone()).collect()
    }

    async fn evaluate_one(&self, span: &Span) -> Vec<Match> {
        let context = Self::span_context(span);
        self.compiled
            .iter()
            .filter(|entry| entry.value().rule.enabled && !entry.value().trace_scope)
            .filter_map(|entry| Self::evaluate(entry.key(), entry.value(), &context))
            .collect()
    }

    async fn evaluate_trace(&self, _trace_id: &str, trace: &TraceSlot) -> Vec<Match> {
        let context = Self::trace_context(trace);
        self.compiled
            .iter()
            .filter(|entry| entry.value().rule.enabled && entry.value().trace_scope)
            .filter_map(|entry| Self::evaluate(entry.key(), entry.value(), &context))
            .collect()
    }
}

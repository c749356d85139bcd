//! End-to-end exercises of the wired application context: create a rule,
//! ingest spans, and confirm a violation is recorded.

use std::sync::Arc;

use ruleguard::domain::entities::{NewRule, SpanStatus};
use ruleguard::domain::ports::RuleEngine;
use ruleguard::infrastructure::{AppConfig, AppContext};
use ruleguard::providers::EvalexprRuleEngine;

async fn bootstrap_with_tempdir() -> (tempfile::TempDir, Arc<AppContext>) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::load(None).unwrap();
    config.store_path = dir.path().join("ruleguard.sqlite");
    config.trace_idle_window_millis = 50;

    let engine: Arc<dyn RuleEngine> = Arc::new(EvalexprRuleEngine::new());
    let context = Arc::new(AppContext::bootstrap(&config, engine).await.unwrap());
    (dir, context)
}

fn span(trace_id: &str, span_id: &str, duration_ms: i64) -> ruleguard::domain::entities::Span {
    let start = chrono::Utc::now();
    ruleguard::domain::entities::Span {
        trace_id: trace_id.to_owned(),
        span_id: span_id.to_owned(),
        parent_span_id: None,
        operation_name: "GET /slow".to_owned(),
        service_name: "api".to_owned(),
        status: SpanStatus::Ok,
        start_time: start,
        end_time: start + chrono::Duration::milliseconds(duration_ms),
        attributes: std::collections::BTreeMap::new(),
    }
}

#[tokio::test]
async fn create_rule_then_ingest_records_violation() {
    let (_dir, context) = bootstrap_with_tempdir().await;

    context
        .administrator
        .create(NewRule {
            name: "slow-span".to_owned(),
            description: "flags spans over 100ms".to_owned(),
            expression: "span.duration > 100".to_owned(),
            enabled: true,
            severity: "warning".to_owned(),
            tags: vec![],
        })
        .await
        .unwrap();

    let summary = context
        .ingest
        .ingest_batch(vec![span("t1", "s1", 250)])
        .await
        .unwrap();
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.violations, 1);

    let violations = context
        .violations
        .query(&ruleguard::domain::entities::ViolationQuery::default())
        .await
        .unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule_id, "slow-span");

    context.trace_buffer.stop().await;
}

#[tokio::test]
async fn disabling_a_rule_stops_it_from_matching() {
    let (_dir, context) = bootstrap_with_tempdir().await;

    context
        .administrator
        .create(NewRule {
            name: "slow-span".to_owned(),
            description: "flags spans over 100ms".to_owned(),
            expression: "span.duration > 100".to_owned(),
            enabled: true,
            severity: "warning".to_owned(),
            tags: vec![],
        })
        .await
        .unwrap();
    context.administrator.set_enabled("slow-span", false).await.unwrap();

    let summary = context
        .ingest
        .ingest_batch(vec![span("t1", "s1", 250)])
        .await
        .unwrap();
    assert_eq!(summary.violations, 0);

    context.trace_buffer.stop().await;
}

#[tokio::test]
async fn enable_persists_across_simulated_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::load(None).unwrap();
    config.store_path = dir.path().join("ruleguard.sqlite");
    config.trace_idle_window_millis = 50;

    let engine: Arc<dyn RuleEngine> = Arc::new(EvalexprRuleEngine::new());
    let context = Arc::new(AppContext::bootstrap(&config, engine).await.unwrap());
    context
        .administrator
        .create(NewRule {
            name: "slow-span".to_owned(),
            description: String::new(),
            expression: "span.duration > 100".to_owned(),
            enabled: false,
            severity: "warning".to_owned(),
            tags: vec![],
        })
        .await
        .unwrap();
    context.administrator.set_enabled("slow-span", true).await.unwrap();
    context.trace_buffer.stop().await;

    // Simulate a restart: a brand-new engine, reloaded from the same store.
    let engine: Arc<dyn RuleEngine> = Arc::new(EvalexprRuleEngine::new());
    let context = Arc::new(AppContext::bootstrap(&config, engine).await.unwrap());
    let reloaded = context.engine.get("slow-span").await.unwrap();
    assert!(reloaded.enabled);
    context.trace_buffer.stop().await;
}

#[tokio::test]
async fn deleting_a_rule_removes_it_from_the_catalog() {
    let (_dir, context) = bootstrap_with_tempdir().await;

    context
        .administrator
        .create(NewRule {
            name: "tmp-rule".to_owned(),
            description: String::new(),
            expression: "span.duration > 1".to_owned(),
            enabled: true,
            severity: "info".to_owned(),
            tags: vec![],
        })
        .await
        .unwrap();
    context.administrator.delete("tmp-rule").await.unwrap();
    let err = context.administrator.get("tmp-rule").await.unwrap_err();
    assert!(err.is_not_found());

    context.trace_buffer.stop().await;
}

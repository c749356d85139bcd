//! Thin HTTP handlers: each calls straight into an application-layer use
//! case with no business logic of its own.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ruleguard_domain::entities::{NewRule, Rule, RuleEdit, Span, Violation, ViolationQuery};
use ruleguard_domain::ports::RuleFilter;

use super::error::ApiError;
use super::state::AppState;

/// Request body for `POST /v1/rules`.
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    name: String,
    description: String,
    expression: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// `POST /v1/rules`
///
/// # Errors
///
/// Returns [`ApiError`] if the rule already exists or fails validation.
pub async fn create_rule(
    State(state): State<AppState>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<Json<Rule>, ApiError> {
    let rule = state
        .context
        .administrator
        .create(NewRule {
            name: request.name,
            description: request.description,
            expression: request.expression,
            enabled: request.enabled,
            severity: request.severity,
            tags: request.tags,
        })
        .await?;
    Ok(Json(rule))
}

/// Query parameters for `GET /v1/rules`.
#[derive(Debug, Deserialize, Default)]
pub struct ListRulesQuery {
    #[serde(default)]
    enabled_only: bool,
    severity: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// `GET /v1/rules`
///
/// # Errors
///
/// Returns [`ApiError`] if the store fails to list rules.
pub async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<ListRulesQuery>,
) -> Result<Json<Vec<Rule>>, ApiError> {
    let filter = RuleFilter {
        enabled_only: query.enabled_only,
        severity: query.severity,
        tags: query.tags,
    };
    let rules = state.context.administrator.list(&filter).await?;
    Ok(Json(rules))
}

/// Response body for `GET /v1/rules/:id`.
#[derive(Debug, Serialize)]
pub struct GetRuleResponse {
    rule: Rule,
    state: String,
}

/// `GET /v1/rules/:id`
///
/// # Errors
///
/// Returns [`ApiError`] if the rule does not exist.
pub async fn get_rule(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<GetRuleResponse>, ApiError> {
    let (rule, fsm_state) = state.context.administrator.get(&id).await?;
    Ok(Json(GetRuleResponse {
        rule,
        state: fsm_state.to_string(),
    }))
}

/// Request body for `PUT /v1/rules/:id`.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateRuleRequest {
    description: Option<String>,
    expression: Option<String>,
    severity: Option<String>,
    tags: Option<Vec<String>>,
}

/// `PUT /v1/rules/:id`
///
/// # Errors
///
/// Returns [`ApiError`] if the rule does not exist or the edit fails
/// validation.
pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRuleRequest>,
) -> Result<Json<Rule>, ApiError> {
    let rule = state
        .context
        .administrator
        .update(
            &id,
            RuleEdit {
                description: request.description,
                expression: request.expression,
                severity: request.severity,
                tags: request.tags,
            },
        )
        .await?;
    Ok(Json(rule))
}

/// `DELETE /v1/rules/:id`
///
/// # Errors
///
/// Returns [`ApiError`] if the rule does not exist.
pub async fn delete_rule(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), ApiError> {
    state.context.administrator.delete(&id).await?;
    Ok(())
}

/// `POST /v1/rules/:id/enable`
///
/// # Errors
///
/// Returns [`ApiError`] if the rule does not exist.
pub async fn enable_rule(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Rule>, ApiError> {
    let rule = state.context.administrator.set_enabled(&id, true).await?;
    Ok(Json(rule))
}

/// `POST /v1/rules/:id/disable`
///
/// # Errors
///
/// Returns [`ApiError`] if the rule does not exist.
pub async fn disable_rule(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Rule>, ApiError> {
    let rule = state.context.administrator.set_enabled(&id, false).await?;
    Ok(Json(rule))
}

/// `POST /v1/spans`
///
/// # Errors
///
/// Returns [`ApiError`] if the batch exceeds the configured size limit.
pub async fn ingest_spans(
    State(state): State<AppState>,
    Json(spans): Json<Vec<Span>>,
) -> Result<Json<ruleguard_application::IngestSummary>, ApiError> {
    let summary = state.context.ingest.ingest_batch(spans).await?;
    Ok(Json(summary))
}

/// Query parameters for `GET /v1/violations`.
#[derive(Debug, Deserialize, Default)]
pub struct ListViolationsQuery {
    rule_id: Option<String>,
    trace_id: Option<String>,
    #[serde(default)]
    limit: usize,
}

/// `GET /v1/violations`
///
/// # Errors
///
/// Returns [`ApiError`] if the store fails to query violations.
pub async fn list_violations(
    State(state): State<AppState>,
    Query(query): Query<ListViolationsQuery>,
) -> Result<Json<Vec<Violation>>, ApiError> {
    let violations = state
        .context
        .violations
        .query(&ViolationQuery {
            rule_id: query.rule_id,
            trace_id: query.trace_id,
            since: None,
            limit: query.limit,
        })
        .await?;
    Ok(Json(violations))
}

/// `GET /healthz`: process liveness, independent of adapter health.
pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /readyz`: readiness, confirming the rule engine has at least
/// initialized (even with zero loaded rules).
pub async fn readyz(State(state): State<AppState>) -> Json<serde_json::Value> {
    let loaded = state.context.engine.loaded_ids().await.len();
    Json(serde_json::json!({ "ready": true, "loaded_rules": loaded }))
}

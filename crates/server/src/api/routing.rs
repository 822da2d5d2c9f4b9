use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use siren_core::{AuditLog, AuditQuery};
use siren_routing::{RouteAlertResponse, SimulationResult, TestRuleResult};
use siren_store::Page;

use super::rules::RuleRequest;
use super::schemas::{AlertRequest, PageQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// Route an alert through the live pipeline.
pub async fn route_alert(
    State(state): State<AppState>,
    Json(req): Json<AlertRequest>,
) -> Result<Json<RouteAlertResponse>, ApiError> {
    let response = state.router.route_alert(req.into_alert()).await?;
    Ok(Json(response))
}

/// Body for routing simulation.
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub alert: AlertRequest,
    #[serde(default)]
    pub include_disabled: bool,
    #[serde(default)]
    pub simulate_time: Option<DateTime<Utc>>,
}

/// Evaluate the rule set without executing real actions or persisting
/// anything.
pub async fn simulate(
    State(state): State<AppState>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SimulationResult>, ApiError> {
    let result = state
        .router
        .simulate(req.alert.into_alert(), req.include_disabled, req.simulate_time)
        .await?;
    Ok(Json(result))
}

/// Body for testing a single ad-hoc rule.
#[derive(Debug, Deserialize)]
pub struct TestRuleRequest {
    pub rule: RuleRequest,
    pub sample_alert: AlertRequest,
    #[serde(default)]
    pub simulate_time: Option<DateTime<Utc>>,
}

/// Evaluate one rule against a sample alert, without persistence.
pub async fn test_rule(
    State(state): State<AppState>,
    Json(req): Json<TestRuleRequest>,
) -> Result<Json<TestRuleResult>, ApiError> {
    let TestRuleRequest {
        rule,
        sample_alert,
        simulate_time,
    } = req;
    let mut candidate = siren_core::RoutingRule::new(rule.name.clone(), rule.priority);
    candidate.description = rule.description.clone();
    candidate.enabled = rule.enabled;
    candidate.conditions = rule.conditions.clone();
    candidate.actions = rule.actions.clone();
    candidate.time_condition = rule.time_condition.clone();
    candidate.cel_expression = rule.cel_expression.clone();

    let result = state
        .router
        .test_rule(&candidate, sample_alert.into_alert(), simulate_time)?;
    Ok(Json(result))
}

/// Audit log filter query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    #[serde(default)]
    pub alert_id: Option<String>,
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub matched_only: bool,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    // Pagination fields are inlined: serde_urlencoded cannot mix
    // `flatten` with typed primitives.
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_token: Option<String>,
}

/// Query persisted routing audit logs, newest first.
pub async fn audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Page<AuditLog>>, ApiError> {
    let filter = AuditQuery {
        alert_id: query.alert_id,
        rule_id: query.rule_id,
        matched_only: query.matched_only,
        from: query.from,
        until: query.until,
    };
    let page_request = PageQuery {
        page_size: query.page_size,
        page_token: query.page_token,
    }
    .to_page_request();
    let page = state.router.audit_logs(&filter, &page_request).await?;
    Ok(Json(page))
}

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

use siren_core::{Action, Condition, RoutingRule, TimeCondition};
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating a routing rule.
#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub time_condition: Option<TimeCondition>,
    #[serde(default)]
    pub cel_expression: Option<String>,
}

const fn default_enabled() -> bool {
    true
}

impl RuleRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("rule name is required".into()));
        }
        Ok(())
    }

    fn apply(self, mut rule: RoutingRule) -> RoutingRule {
        rule.name = self.name;
        rule.description = self.description;
        rule.priority = self.priority;
        rule.enabled = self.enabled;
        rule.conditions = self.conditions;
        rule.actions = self.actions;
        rule.time_condition = self.time_condition;
        rule.cel_expression = self.cel_expression;
        rule
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<RuleRequest>,
) -> Result<(StatusCode, Json<RoutingRule>), ApiError> {
    req.validate()?;
    let rule = req.apply(RoutingRule::new(String::new(), 0));
    let created = state.rules.create(rule).await?;
    info!(rule = %created.id, name = %created.name, "routing rule created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoutingRule>, ApiError> {
    Ok(Json(state.rules.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<RoutingRule>>, ApiError> {
    Ok(Json(state.rules.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RuleRequest>,
) -> Result<Json<RoutingRule>, ApiError> {
    req.validate()?;
    let existing = state.rules.get(&id).await?;
    let updated = state.rules.update(req.apply(existing)).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.rules.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body for the atomic reorder operation: `rule_id → priority`.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub priorities: HashMap<String, i32>,
}

pub async fn reorder(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<RoutingRule>>, ApiError> {
    if req.priorities.is_empty() {
        return Err(ApiError::BadRequest("priorities map is empty".into()));
    }
    let updated = state.router.reorder_rules(&req.priorities).await?;
    info!(rules = updated.len(), "routing rules reordered");
    Ok(Json(updated))
}

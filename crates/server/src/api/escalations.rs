use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use siren_core::{EscalationPolicy, EscalationStep, ExhaustedAction};
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating an escalation policy.
#[derive(Debug, Deserialize)]
pub struct PolicyRequest {
    pub name: String,
    pub steps: Vec<EscalationStep>,
    #[serde(default)]
    pub repeat_count: u32,
    #[serde(default)]
    pub exhausted_action: Option<ExhaustedAction>,
}

impl PolicyRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("policy name is required".into()));
        }
        if self.steps.is_empty() {
            return Err(ApiError::BadRequest("policy needs at least one step".into()));
        }
        Ok(())
    }

    fn apply(self, mut policy: EscalationPolicy) -> EscalationPolicy {
        policy.name = self.name;
        policy.steps = self.steps;
        policy.repeat_count = self.repeat_count;
        policy.exhausted_action = self.exhausted_action;
        policy
    }
}

pub async fn create_policy(
    State(state): State<AppState>,
    Json(req): Json<PolicyRequest>,
) -> Result<(StatusCode, Json<EscalationPolicy>), ApiError> {
    req.validate()?;
    let policy = req.apply(EscalationPolicy::new(String::new()));
    Ok((
        StatusCode::CREATED,
        Json(state.policies.create(policy).await?),
    ))
}

pub async fn get_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EscalationPolicy>, ApiError> {
    Ok(Json(state.policies.get(&id).await?))
}

pub async fn list_policies(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<EscalationPolicy>>, ApiError> {
    Ok(Json(state.policies.list(&page.to_page_request()).await?))
}

pub async fn update_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PolicyRequest>,
) -> Result<Json<EscalationPolicy>, ApiError> {
    req.validate()?;
    let existing = state.policies.get(&id).await?;
    Ok(Json(state.policies.update(req.apply(existing)).await?))
}

pub async fn delete_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.policies.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Active escalation runtime (stub surface)
// ---------------------------------------------------------------------------

/// Body for starting an escalation.
#[derive(Debug, Deserialize)]
pub struct StartEscalationRequest {
    pub alert_id: String,
    pub policy_id: String,
}

/// Not implemented: the escalation runtime lives outside this service.
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartEscalationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = state
        .active_escalations
        .start(&req.alert_id, &req.policy_id)
        .await?;
    Ok(Json(serde_json::json!({ "escalation_id": id })))
}

/// Not implemented: the escalation runtime lives outside this service.
pub async fn get_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.active_escalations.get(&id).await?))
}

/// Not implemented: the escalation runtime lives outside this service.
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.active_escalations.cancel(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

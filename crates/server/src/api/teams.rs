use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use siren_core::Team;
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating a team.
#[derive(Debug, Deserialize)]
pub struct TeamRequest {
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub schedule_id: Option<String>,
}

impl TeamRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("team name is required".into()));
        }
        Ok(())
    }

    fn apply(self, mut team: Team) -> Team {
        team.name = self.name;
        team.member_ids = self.member_ids;
        team.channel = self.channel;
        team.schedule_id = self.schedule_id;
        team
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<TeamRequest>,
) -> Result<(StatusCode, Json<Team>), ApiError> {
    req.validate()?;
    let team = req.apply(Team::new(String::new()));
    Ok((StatusCode::CREATED, Json(state.teams.create(team).await?)))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Team>, ApiError> {
    Ok(Json(state.teams.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Team>>, ApiError> {
    Ok(Json(state.teams.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TeamRequest>,
) -> Result<Json<Team>, ApiError> {
    req.validate()?;
    let existing = state.teams.get(&id).await?;
    Ok(Json(state.teams.update(req.apply(existing)).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.teams.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use siren_core::{Rotation, Schedule, ScheduleOverride};
use siren_schedule::{
    HandoffSummary, OncallShift, OncallSnapshot, acknowledge_handoff, handoff_summary, oncall_at,
    upcoming_shifts,
};
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating a schedule.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub name: String,
    pub timezone: String,
    #[serde(default)]
    pub rotations: Vec<Rotation>,
    #[serde(default)]
    pub overrides: Vec<ScheduleOverride>,
}

impl ScheduleRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("schedule name is required".into()));
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ApiError::BadRequest(format!(
                "invalid timezone {:?}",
                self.timezone
            )));
        }
        for ov in &self.overrides {
            if ov.end_time <= ov.start_time {
                return Err(ApiError::BadRequest("override interval is inverted".into()));
            }
        }
        Ok(())
    }

    fn apply(self, mut schedule: Schedule) -> Schedule {
        schedule.name = self.name;
        schedule.timezone = self.timezone;
        schedule.rotations = self.rotations;
        schedule.overrides = self.overrides;
        schedule
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), ApiError> {
    req.validate()?;
    let schedule = req.apply(Schedule::new(String::new(), "UTC"));
    Ok((
        StatusCode::CREATED,
        Json(state.schedules.create(schedule).await?),
    ))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    Ok(Json(state.schedules.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Schedule>>, ApiError> {
    Ok(Json(state.schedules.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<Schedule>, ApiError> {
    req.validate()?;
    let existing = state.schedules.get(&id).await?;
    Ok(Json(state.schedules.update(req.apply(existing)).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.schedules.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// On-call queries
// ---------------------------------------------------------------------------

/// Optional time override for on-call queries.
#[derive(Debug, Default, Deserialize)]
pub struct OncallQuery {
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

/// Who is on call now (or at `?at=`).
pub async fn current_oncall(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OncallQuery>,
) -> Result<Json<OncallSnapshot>, ApiError> {
    let schedule = state.schedules.get(&id).await?;
    let at = query.at.unwrap_or_else(Utc::now);
    Ok(Json(oncall_at(&schedule, at)?))
}

/// Range query for upcoming shifts.
#[derive(Debug, Deserialize)]
pub struct ShiftsQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    pub until: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
    // Pagination fields are inlined: serde_urlencoded cannot mix
    // `flatten` with typed primitives.
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_token: Option<String>,
}

/// Enumerate shifts between `from` (default now) and `until`.
pub async fn upcoming(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ShiftsQuery>,
) -> Result<Json<Page<OncallShift>>, ApiError> {
    let schedule = state.schedules.get(&id).await?;
    let from = query.from.unwrap_or_else(Utc::now);
    if query.until <= from {
        return Err(ApiError::BadRequest("until must be after from".into()));
    }
    let shifts = upcoming_shifts(&schedule, from, query.until, query.user_id.as_deref())?;
    let page_request = PageQuery {
        page_size: query.page_size,
        page_token: query.page_token,
    }
    .to_page_request();
    let page = siren_store::page::paginate(shifts, &page_request).map_err(ApiError::from)?;
    Ok(Json(page))
}

/// Body for acknowledging a handoff.
#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub user_id: String,
}

/// Record a handoff acknowledgement for the current on-call.
pub async fn acknowledge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AcknowledgeRequest>,
) -> Result<Json<OncallSnapshot>, ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".into()));
    }
    let snapshot =
        acknowledge_handoff(state.schedules.as_ref(), &id, &req.user_id, Utc::now()).await?;
    Ok(Json(snapshot))
}

/// Current handoff summary (who is on, whether they acknowledged).
pub async fn handoff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HandoffSummary>, ApiError> {
    let summary = handoff_summary(state.schedules.as_ref(), &id, Utc::now()).await?;
    Ok(Json(summary))
}

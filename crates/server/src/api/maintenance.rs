use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use siren_core::{MaintenanceAction, MaintenanceWindow, WindowStatus};
use siren_maintenance::MaintenanceCheck;
use siren_store::Page;

use super::schemas::{AlertRequest, PageQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating a maintenance window.
#[derive(Debug, Deserialize)]
pub struct WindowRequest {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub action: MaintenanceAction,
    #[serde(default)]
    pub affected_sites: Vec<String>,
    #[serde(default)]
    pub affected_services: Vec<String>,
    #[serde(default)]
    pub label_selectors: HashMap<String, String>,
}

impl WindowRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::BadRequest("window title is required".into()));
        }
        if self.end_time <= self.start_time {
            return Err(ApiError::BadRequest("window interval is inverted".into()));
        }
        Ok(())
    }

    fn apply(self, mut window: MaintenanceWindow) -> MaintenanceWindow {
        window.title = self.title;
        window.start_time = self.start_time;
        window.end_time = self.end_time;
        window.action = self.action;
        window.affected_sites = self.affected_sites;
        window.affected_services = self.affected_services;
        window.label_selectors = self.label_selectors;
        window
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<WindowRequest>,
) -> Result<(StatusCode, Json<MaintenanceWindow>), ApiError> {
    req.validate()?;
    let window = req.apply(MaintenanceWindow::new(
        String::new(),
        Utc::now(),
        Utc::now() + chrono::Duration::hours(1),
        MaintenanceAction::Suppress,
    ));
    Ok((
        StatusCode::CREATED,
        Json(state.windows.create(window).await?),
    ))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MaintenanceWindow>, ApiError> {
    Ok(Json(state.windows.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<MaintenanceWindow>>, ApiError> {
    Ok(Json(state.windows.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WindowRequest>,
) -> Result<Json<MaintenanceWindow>, ApiError> {
    req.validate()?;
    let existing = state.windows.get(&id).await?;
    Ok(Json(state.windows.update(req.apply(existing)).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.windows.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel a window. Fails with 400 when the window is already terminal.
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MaintenanceWindow>, ApiError> {
    let window = state.windows.set_status(&id, WindowStatus::Cancelled).await?;
    info!(window = %window.id, title = %window.title, "maintenance window cancelled");
    Ok(Json(window))
}

/// Check whether an alert is covered by an active window.
pub async fn check(
    State(state): State<AppState>,
    Json(req): Json<AlertRequest>,
) -> Result<Json<MaintenanceCheck>, ApiError> {
    let check = state
        .maintenance
        .check_alert(&req.into_alert(), Utc::now())
        .await?;
    Ok(Json(check))
}

/// Filters for the active-window listing.
#[derive(Debug, Default, Deserialize)]
pub struct ActiveQuery {
    /// Comma-separated site codes.
    #[serde(default)]
    pub site_ids: Option<String>,
    /// Comma-separated service names.
    #[serde(default)]
    pub service_ids: Option<String>,
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// List currently active windows, optionally filtered by site/service.
pub async fn active(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<MaintenanceWindow>>, ApiError> {
    let sites = split_csv(query.site_ids.as_deref());
    let services = split_csv(query.service_ids.as_deref());
    let windows = state
        .maintenance
        .active_windows(Utc::now(), &sites, &services)
        .await?;
    Ok(Json(windows))
}

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use siren_core::Site;
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating a site.
#[derive(Debug, Deserialize)]
pub struct SiteRequest {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl SiteRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() || self.code.trim().is_empty() {
            return Err(ApiError::BadRequest("site name and code are required".into()));
        }
        Ok(())
    }

    fn apply(self, mut site: Site) -> Site {
        site.name = self.name;
        site.code = self.code;
        site.labels = self.labels;
        site
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<SiteRequest>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    req.validate()?;
    let site = req.apply(Site::new(String::new(), String::new()));
    Ok((StatusCode::CREATED, Json(state.sites.create(site).await?)))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Site>, ApiError> {
    Ok(Json(state.sites.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Site>>, ApiError> {
    Ok(Json(state.sites.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SiteRequest>,
) -> Result<Json<Site>, ApiError> {
    req.validate()?;
    let existing = state.sites.get(&id).await?;
    Ok(Json(state.sites.update(req.apply(existing)).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sites.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

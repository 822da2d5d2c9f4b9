use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use siren_core::Carrier;
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating a carrier.
#[derive(Debug, Deserialize)]
pub struct CarrierRequest {
    pub name: String,
    pub asn: u32,
    #[serde(default)]
    pub noc_contacts: Vec<String>,
}

impl CarrierRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("carrier name is required".into()));
        }
        Ok(())
    }

    fn apply(self, mut carrier: Carrier) -> Carrier {
        carrier.name = self.name;
        carrier.asn = self.asn;
        carrier.noc_contacts = self.noc_contacts;
        carrier
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CarrierRequest>,
) -> Result<(StatusCode, Json<Carrier>), ApiError> {
    req.validate()?;
    let carrier = req.apply(Carrier::new(String::new(), 0));
    Ok((
        StatusCode::CREATED,
        Json(state.carriers.create(carrier).await?),
    ))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Carrier>, ApiError> {
    Ok(Json(state.carriers.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Carrier>>, ApiError> {
    Ok(Json(state.carriers.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CarrierRequest>,
) -> Result<Json<Carrier>, ApiError> {
    req.validate()?;
    let existing = state.carriers.get(&id).await?;
    let updated = state.carriers.update(req.apply(existing)).await?;
    state.carrier_resolver.invalidate(updated.asn);
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = state.carriers.get(&id).await?;
    state.carriers.delete(&id).await?;
    state.carrier_resolver.invalidate(existing.asn);
    Ok(StatusCode::NO_CONTENT)
}

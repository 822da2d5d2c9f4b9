use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use siren_core::{EquipmentCategory, EquipmentType, normalize_equipment_name};
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Body for creating or updating an equipment type.
#[derive(Debug, Deserialize)]
pub struct EquipmentRequest {
    pub name: String,
    pub category: EquipmentCategory,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default = "default_criticality")]
    pub criticality: u8,
    #[serde(default)]
    pub default_team_id: Option<String>,
    #[serde(default)]
    pub default_escalation_policy_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

const fn default_criticality() -> u8 {
    3
}

impl EquipmentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("equipment name is required".into()));
        }
        if !(1..=5).contains(&self.criticality) {
            return Err(ApiError::BadRequest("criticality must be 1..=5".into()));
        }
        Ok(())
    }

    fn apply(self, mut equipment: EquipmentType) -> EquipmentType {
        equipment.name = normalize_equipment_name(&self.name);
        equipment.category = self.category;
        equipment.vendor = self.vendor;
        equipment.criticality = self.criticality;
        equipment.default_team_id = self.default_team_id;
        equipment.default_escalation_policy_id = self.default_escalation_policy_id;
        equipment.metadata = self.metadata;
        equipment
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<EquipmentRequest>,
) -> Result<(StatusCode, Json<EquipmentType>), ApiError> {
    req.validate()?;
    let equipment = req.apply(EquipmentType::new("placeholder", EquipmentCategory::Network));
    Ok((
        StatusCode::CREATED,
        Json(state.equipment.create(equipment).await?),
    ))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EquipmentType>, ApiError> {
    Ok(Json(state.equipment.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<EquipmentType>>, ApiError> {
    Ok(Json(state.equipment.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EquipmentRequest>,
) -> Result<Json<EquipmentType>, ApiError> {
    req.validate()?;
    let existing = state.equipment.get(&id).await?;
    let updated = state.equipment.update(req.apply(existing)).await?;
    state.equipment_resolver.invalidate(&updated.name);
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = state.equipment.get(&id).await?;
    state.equipment.delete(&id).await?;
    state.equipment_resolver.invalidate(&existing.name);
    Ok(StatusCode::NO_CONTENT)
}

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use siren_core::{Contact, Customer, CustomerTier, Severity};
use siren_store::Page;

use super::schemas::PageQuery;
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Customer tiers
// ---------------------------------------------------------------------------

/// Body for creating or updating a customer tier.
#[derive(Debug, Deserialize)]
pub struct TierRequest {
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub response_times: HashMap<Severity, u32>,
    #[serde(default = "default_multiplier")]
    pub escalation_multiplier: f64,
    #[serde(default)]
    pub severity_boost: i32,
    #[serde(default)]
    pub dedicated_team_id: Option<String>,
}

const fn default_multiplier() -> f64 {
    1.0
}

impl TierRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("tier name is required".into()));
        }
        if self.level == 0 {
            return Err(ApiError::BadRequest("tier level must be >= 1".into()));
        }
        if self.escalation_multiplier <= 0.0 {
            return Err(ApiError::BadRequest(
                "escalation_multiplier must be positive".into(),
            ));
        }
        Ok(())
    }

    fn apply(self, mut tier: CustomerTier) -> CustomerTier {
        tier.name = self.name;
        tier.level = self.level;
        tier.response_times = self.response_times;
        tier.escalation_multiplier = self.escalation_multiplier;
        tier.severity_boost = self.severity_boost;
        tier.dedicated_team_id = self.dedicated_team_id;
        tier
    }
}

pub async fn create_tier(
    State(state): State<AppState>,
    Json(req): Json<TierRequest>,
) -> Result<(StatusCode, Json<CustomerTier>), ApiError> {
    req.validate()?;
    let tier = req.apply(CustomerTier::new(String::new(), 1));
    Ok((StatusCode::CREATED, Json(state.tiers.create(tier).await?)))
}

pub async fn get_tier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerTier>, ApiError> {
    Ok(Json(state.tiers.get(&id).await?))
}

pub async fn list_tiers(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<CustomerTier>>, ApiError> {
    Ok(Json(state.tiers.list(&page.to_page_request()).await?))
}

pub async fn update_tier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TierRequest>,
) -> Result<Json<CustomerTier>, ApiError> {
    req.validate()?;
    let existing = state.tiers.get(&id).await?;
    Ok(Json(state.tiers.update(req.apply(existing)).await?))
}

pub async fn delete_tier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tiers.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

/// Body for creating or updating a customer.
#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    pub name: String,
    pub account_id: String,
    pub tier_id: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub ip_ranges: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl CustomerRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() || self.account_id.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "customer name and account_id are required".into(),
            ));
        }
        for cidr in &self.ip_ranges {
            if cidr.parse::<siren_core::IpRange>().is_err() {
                return Err(ApiError::BadRequest(format!("invalid CIDR {cidr:?}")));
            }
        }
        Ok(())
    }

    fn apply(self, mut customer: Customer) -> Customer {
        customer.name = self.name;
        customer.account_id = self.account_id;
        customer.tier_id = self.tier_id;
        customer.domains = self.domains;
        customer.ip_ranges = self.ip_ranges;
        customer.contacts = self.contacts;
        customer
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    req.validate()?;
    // The tier must exist before a customer can point at it.
    state.tiers.get(&req.tier_id).await?;
    let customer = req.apply(Customer::new(String::new(), String::new(), String::new()));
    Ok((
        StatusCode::CREATED,
        Json(state.customers.create(customer).await?),
    ))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(state.customers.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Customer>>, ApiError> {
    Ok(Json(state.customers.list(&page.to_page_request()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    req.validate()?;
    let existing = state.customers.get(&id).await?;
    let updated = state.customers.update(req.apply(existing)).await?;
    // The resolver may hold a stale copy under any of its keys.
    state
        .customer_resolver
        .invalidate(&format!("id:{}", updated.id));
    state
        .customer_resolver
        .invalidate(&format!("account:{}", updated.account_id));
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.customers.delete(&id).await?;
    state.customer_resolver.invalidate(&format!("id:{id}"));
    Ok(StatusCode::NO_CONTENT)
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::Severity;

/// A contact person attached to a customer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Role label, e.g. `"noc"`, `"billing"`.
    pub role: Option<String>,
}

/// An SLA class assigning response-time budgets and escalation behaviour
/// to the customers in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerTier {
    /// Unique tier identifier.
    pub id: String,
    /// Unique tier name, e.g. `"platinum"`.
    pub name: String,
    /// Unique tier level; 1 is the highest tier.
    pub level: u32,
    /// Response-time budget per severity, in seconds.
    #[serde(default)]
    pub response_times: HashMap<Severity, u32>,
    /// Escalation delay multiplier. 1.0 is normal; 0.5 escalates twice
    /// as fast.
    pub escalation_multiplier: f64,
    /// Integer added to the severity of this tier's alerts.
    pub severity_boost: i32,
    /// Team that handles this tier's alerts directly, when set.
    pub dedicated_team_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerTier {
    /// Create a tier with default multiplier 1.0 and no boost.
    #[must_use]
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            level,
            response_times: HashMap::new(),
            escalation_multiplier: 1.0,
            severity_boost: 0,
            dedicated_team_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The effective tier knobs applied during routing.
///
/// Resolvers fall back to this default when a customer's tier cannot be
/// loaded, so routing never stalls on tier lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub escalation_multiplier: f64,
    pub severity_boost: i32,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            escalation_multiplier: 1.0,
            severity_boost: 0,
        }
    }
}

impl From<&CustomerTier> for TierConfig {
    fn from(tier: &CustomerTier) -> Self {
        Self {
            escalation_multiplier: tier.escalation_multiplier,
            severity_boost: tier.severity_boost,
        }
    }
}

/// A customer whose infrastructure emits alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unique external account identifier.
    pub account_id: String,
    /// The tier this customer belongs to.
    pub tier_id: String,
    /// Domains owned by the customer, matched against `domain` labels.
    #[serde(default)]
    pub domains: Vec<String>,
    /// CIDR ranges owned by the customer, matched against `client_ip`
    /// labels.
    #[serde(default)]
    pub ip_ranges: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Create a new customer.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        account_id: impl Into<String>,
        tier_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            account_id: account_id.into(),
            tier_id: tier_id.into(),
            domains: Vec::new(),
            ip_ranges: Vec::new(),
            contacts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add an owned domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    /// Add an owned CIDR range.
    #[must_use]
    pub fn with_ip_range(mut self, cidr: impl Into<String>) -> Self {
        self.ip_ranges.push(cidr.into());
        self
    }
}

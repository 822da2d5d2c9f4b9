//! Reference entities addressed by id from the routing and resolver
//! layers: sites, teams, and carriers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical or logical site (datacenter, POP, region).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    /// Short code matched against alert `site` labels, e.g. `"us-east-1"`.
    pub code: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Site {
    #[must_use]
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            code: code.into(),
            labels: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An operational team that can be notified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    /// User ids of the team members.
    #[serde(default)]
    pub member_ids: Vec<String>,
    /// Default notification channel, e.g. `"#ops-alerts"`.
    pub channel: Option<String>,
    /// Schedule consulted for `oncall`-scoped notifications.
    pub schedule_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            member_ids: Vec::new(),
            channel: None,
            schedule_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An upstream carrier identified by its autonomous system number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub id: String,
    pub name: String,
    /// Unique ASN.
    pub asn: u32,
    /// NOC contact addresses.
    #[serde(default)]
    pub noc_contacts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Carrier {
    #[must_use]
    pub fn new(name: impl Into<String>, asn: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            asn,
            noc_contacts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_serde_roundtrips() {
        let site = Site::new("Ashburn", "us-east-1");
        let json = serde_json::to_string(&site).unwrap();
        let back: Site = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, "us-east-1");

        let carrier = Carrier::new("TransitCo", 64512);
        let json = serde_json::to_string(&carrier).unwrap();
        let back: Carrier = serde_json::from_str(&json).unwrap();
        assert_eq!(back.asn, 64512);
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broad equipment category used for default routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCategory {
    Network,
    Compute,
    Storage,
    Security,
}

/// Normalise an equipment name: lowercase, spaces and hyphens become
/// underscores. `"Load Balancer"` and `"load-balancer"` both normalise to
/// `"load_balancer"`.
#[must_use]
pub fn normalize_equipment_name(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// A class of equipment alerts can originate from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentType {
    /// Unique equipment-type identifier.
    pub id: String,
    /// Normalised unique name (`router`, `load_balancer`, …).
    pub name: String,
    pub category: EquipmentCategory,
    pub vendor: Option<String>,
    /// Criticality 1 (lowest) to 5 (highest). Defaults to 3.
    pub criticality: u8,
    /// Team that handles this equipment by default.
    pub default_team_id: Option<String>,
    /// Escalation policy applied by default.
    pub default_escalation_policy_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentType {
    /// Create an equipment type. The name is normalised on construction.
    #[must_use]
    pub fn new(name: &str, category: EquipmentCategory) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: normalize_equipment_name(name),
            category,
            vendor: None,
            criticality: 3,
            default_team_id: None,
            default_escalation_policy_id: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the vendor.
    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Set the criticality, clamped to 1..=5.
    #[must_use]
    pub fn with_criticality(mut self, criticality: u8) -> Self {
        self.criticality = criticality.clamp(1, 5);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_normalisation() {
        assert_eq!(normalize_equipment_name("Load Balancer"), "load_balancer");
        assert_eq!(normalize_equipment_name("load-balancer"), "load_balancer");
        assert_eq!(normalize_equipment_name("  Router "), "router");
        assert_eq!(normalize_equipment_name("UPS"), "ups");
    }

    #[test]
    fn equipment_defaults() {
        let eq = EquipmentType::new("Core Switch", EquipmentCategory::Network);
        assert_eq!(eq.name, "core_switch");
        assert_eq!(eq.criticality, 3);
    }

    #[test]
    fn criticality_clamped() {
        let eq = EquipmentType::new("pdu", EquipmentCategory::Network).with_criticality(9);
        assert_eq!(eq.criticality, 5);
        let eq = EquipmentType::new("pdu", EquipmentCategory::Network).with_criticality(0);
        assert_eq!(eq.criticality, 1);
    }
}

//! Async store contracts for every aggregate the routing core consumes.
//!
//! Implementations must be `Send + Sync` and safe for concurrent access.
//! All getters return [`StoreError::NotFound`] as the miss sentinel;
//! resolvers rely on that to distinguish a miss from a backend failure.

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use siren_core::{
    AuditLog, AuditQuery, Carrier, Customer, CustomerTier, EquipmentType, EscalationPolicy,
    MaintenanceWindow, RoutingRule, Schedule, Site, Team, WindowStatus,
};

use crate::error::StoreError;
use crate::page::{Page, PageRequest};

/// Persistence for routing rules.
#[async_trait]
pub trait RoutingRuleStore: Send + Sync {
    /// Persist a new rule. Fails with `Duplicate` when an enabled rule
    /// already holds the same priority.
    async fn create(&self, rule: RoutingRule) -> Result<RoutingRule, StoreError>;

    async fn get(&self, id: &str) -> Result<RoutingRule, StoreError>;

    async fn list(&self, page: &PageRequest) -> Result<Page<RoutingRule>, StoreError>;

    /// All enabled rules sorted ascending by `(priority, created_at)`,
    /// the evaluation order of the routing pipeline.
    async fn list_enabled(&self) -> Result<Vec<RoutingRule>, StoreError>;

    /// All rules (enabled and disabled) in evaluation order. Used by
    /// simulation with `include_disabled`.
    async fn list_all_ordered(&self) -> Result<Vec<RoutingRule>, StoreError>;

    async fn update(&self, rule: RoutingRule) -> Result<RoutingRule, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Atomically apply a batch of priority changes. Either every entry
    /// is applied or none is; the duplicate-priority constraint is
    /// checked once at the end of the batch. Returns the updated rules.
    async fn reorder(
        &self,
        priorities: &HashMap<String, i32>,
    ) -> Result<Vec<RoutingRule>, StoreError>;

    /// Bump `match_count` and `last_matched_at` for a rule that matched.
    async fn record_match(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Persistence for customer tiers.
#[async_trait]
pub trait CustomerTierStore: Send + Sync {
    /// Persist a new tier. `name` and `level` are unique.
    async fn create(&self, tier: CustomerTier) -> Result<CustomerTier, StoreError>;
    async fn get(&self, id: &str) -> Result<CustomerTier, StoreError>;
    async fn get_by_level(&self, level: u32) -> Result<CustomerTier, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<CustomerTier>, StoreError>;
    async fn update(&self, tier: CustomerTier) -> Result<CustomerTier, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Persistence for customers.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Persist a new customer. `account_id` is unique.
    async fn create(&self, customer: Customer) -> Result<Customer, StoreError>;
    async fn get(&self, id: &str) -> Result<Customer, StoreError>;
    async fn get_by_account_id(&self, account_id: &str) -> Result<Customer, StoreError>;
    async fn get_by_domain(&self, domain: &str) -> Result<Customer, StoreError>;
    /// First customer whose `ip_ranges` contain `addr`. Malformed stored
    /// ranges are skipped.
    async fn get_by_ip(&self, addr: IpAddr) -> Result<Customer, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<Customer>, StoreError>;
    async fn update(&self, customer: Customer) -> Result<Customer, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Persistence for equipment types.
#[async_trait]
pub trait EquipmentTypeStore: Send + Sync {
    async fn create(&self, equipment: EquipmentType) -> Result<EquipmentType, StoreError>;
    async fn get(&self, id: &str) -> Result<EquipmentType, StoreError>;
    /// Look up by normalised name.
    async fn get_by_name(&self, name: &str) -> Result<EquipmentType, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<EquipmentType>, StoreError>;
    async fn update(&self, equipment: EquipmentType) -> Result<EquipmentType, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Persistence for sites.
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn create(&self, site: Site) -> Result<Site, StoreError>;
    async fn get(&self, id: &str) -> Result<Site, StoreError>;
    async fn get_by_code(&self, code: &str) -> Result<Site, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<Site>, StoreError>;
    async fn update(&self, site: Site) -> Result<Site, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Persistence for teams.
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn create(&self, team: Team) -> Result<Team, StoreError>;
    async fn get(&self, id: &str) -> Result<Team, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<Team>, StoreError>;
    async fn update(&self, team: Team) -> Result<Team, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Persistence for carriers.
#[async_trait]
pub trait CarrierStore: Send + Sync {
    /// Persist a new carrier. `asn` is unique.
    async fn create(&self, carrier: Carrier) -> Result<Carrier, StoreError>;
    async fn get(&self, id: &str) -> Result<Carrier, StoreError>;
    async fn get_by_asn(&self, asn: u32) -> Result<Carrier, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<Carrier>, StoreError>;
    async fn update(&self, carrier: Carrier) -> Result<Carrier, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Persistence for schedules and handoff acknowledgements.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create(&self, schedule: Schedule) -> Result<Schedule, StoreError>;
    async fn get(&self, id: &str) -> Result<Schedule, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<Schedule>, StoreError>;
    async fn update(&self, schedule: Schedule) -> Result<Schedule, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Record a handoff acknowledgement. Advisory only; never changes
    /// on-call selection.
    async fn record_handoff_ack(
        &self,
        schedule_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Acknowledgements recorded for a schedule, newest first, as
    /// `(user_id, acked_at)` pairs.
    async fn list_handoff_acks(
        &self,
        schedule_id: &str,
    ) -> Result<Vec<(String, DateTime<Utc>)>, StoreError>;
}

/// Persistence for maintenance windows.
#[async_trait]
pub trait MaintenanceWindowStore: Send + Sync {
    async fn create(&self, window: MaintenanceWindow) -> Result<MaintenanceWindow, StoreError>;
    async fn get(&self, id: &str) -> Result<MaintenanceWindow, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<MaintenanceWindow>, StoreError>;
    async fn list_by_status(&self, status: WindowStatus)
    -> Result<Vec<MaintenanceWindow>, StoreError>;
    async fn update(&self, window: MaintenanceWindow) -> Result<MaintenanceWindow, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Transition a window's status. Illegal transitions fail with
    /// `Invalid("status")`.
    async fn set_status(&self, id: &str, status: WindowStatus)
    -> Result<MaintenanceWindow, StoreError>;
}

/// Persistence for escalation policies.
#[async_trait]
pub trait EscalationPolicyStore: Send + Sync {
    async fn create(&self, policy: EscalationPolicy) -> Result<EscalationPolicy, StoreError>;
    async fn get(&self, id: &str) -> Result<EscalationPolicy, StoreError>;
    async fn list(&self, page: &PageRequest) -> Result<Page<EscalationPolicy>, StoreError>;
    async fn update(&self, policy: EscalationPolicy) -> Result<EscalationPolicy, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Persistence for routing audit logs.
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// Append one record. The routing pipeline treats failures here as
    /// best-effort: logged, never surfaced to the caller.
    async fn append(&self, log: AuditLog) -> Result<(), StoreError>;

    /// Query records matching a filter, newest first.
    async fn query(&self, query: &AuditQuery, page: &PageRequest)
    -> Result<Page<AuditLog>, StoreError>;
}

/// Store surface for the active-escalation runtime.
///
/// The runtime itself is not implemented; every method of the reference
/// backend returns [`StoreError::Unimplemented`]. The trait exists so
/// the control plane can expose a stable stub surface.
#[async_trait]
pub trait ActiveEscalationStore: Send + Sync {
    async fn start(&self, alert_id: &str, policy_id: &str) -> Result<String, StoreError>;
    async fn get(&self, escalation_id: &str) -> Result<serde_json::Value, StoreError>;
    async fn cancel(&self, escalation_id: &str) -> Result<(), StoreError>;
}

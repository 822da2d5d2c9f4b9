pub mod error;
pub mod page;
pub mod store;

pub use error::StoreError;
pub use page::{Page, PageRequest, decode_offset_token, encode_offset_token};
pub use store::{
    ActiveEscalationStore, AuditLogStore, CarrierStore, CustomerStore, CustomerTierStore,
    EquipmentTypeStore, EscalationPolicyStore, MaintenanceWindowStore, RoutingRuleStore,
    ScheduleStore, SiteStore, TeamStore,
};

pub mod action;
pub mod alert;
pub mod audit;
pub mod customer;
pub mod equipment;
pub mod escalation;
pub mod maintenance;
pub mod net;
pub mod reference;
pub mod rule;
pub mod schedule;

pub use action::{Action, NotifyScope, OncallLevel};
pub use alert::{Alert, AlertSource, AlertStatus, Severity};
pub use audit::{ActionExecution, AuditLog, AuditQuery, ConditionResult, RuleEvaluation};
pub use customer::{Contact, Customer, CustomerTier, TierConfig};
pub use equipment::{EquipmentCategory, EquipmentType, normalize_equipment_name};
pub use escalation::{EscalationPolicy, EscalationStep, EscalationTarget, ExhaustedAction};
pub use maintenance::{MaintenanceAction, MaintenanceWindow, WindowStatus};
pub use net::IpRange;
pub use reference::{Carrier, Site, Team};
pub use rule::{Condition, ConditionOp, RoutingRule, TimeCondition};
pub use schedule::{Rotation, RotationMember, RotationType, Schedule, ScheduleOverride};

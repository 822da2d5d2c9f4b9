//! In-memory store backends.
//!
//! One `RwLock`-guarded map per aggregate type. These backends are the
//! reference implementation used in tests and single-node deployments;
//! SQL-backed variants live behind the same traits.

mod customer;
mod escalation;
mod maintenance;
mod reference;
mod routing;
mod schedule;

pub use customer::{InMemoryCustomerStore, InMemoryCustomerTierStore};
pub use escalation::{InMemoryEscalationPolicyStore, UnimplementedActiveEscalationStore};
pub use maintenance::InMemoryMaintenanceWindowStore;
pub use reference::{
    InMemoryCarrierStore, InMemoryEquipmentTypeStore, InMemorySiteStore, InMemoryTeamStore,
};
pub use routing::{InMemoryAuditLogStore, InMemoryRoutingRuleStore};
pub use schedule::InMemoryScheduleStore;

use std::sync::{PoisonError, RwLockReadGuard, RwLockWriteGuard};

/// Recover the guard from a poisoned read lock. The stores never leave
/// partial state behind a panic, so continuing with the inner value is
/// sound.
pub(crate) fn read_guard<'a, T>(
    result: Result<RwLockReadGuard<'a, T>, PoisonError<RwLockReadGuard<'a, T>>>,
) -> RwLockReadGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// Recover the guard from a poisoned write lock.
pub(crate) fn write_guard<'a, T>(
    result: Result<RwLockWriteGuard<'a, T>, PoisonError<RwLockWriteGuard<'a, T>>>,
) -> RwLockWriteGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

//! Label-driven entity resolution.
//!
//! Every resolver runs the same shape: an ordered list of resolution
//! attempts, each a strategy that extracts a candidate key from the
//! alert's labels and asks the store for it. The first hit wins and is
//! reported together with the strategy that produced it. A TTL cache
//! sits in front of the store; a background sweeper evicts expired
//! entries.

pub mod cache;
pub mod carrier;
pub mod customer;
pub mod equipment;
pub mod error;

pub use cache::{CacheSweeper, ResolverConfig, TtlCache};
pub use carrier::{CarrierResolver, ResolvedCarrier};
pub use customer::{CustomerResolver, ResolvedCustomer};
pub use equipment::{EquipmentResolver, ResolvedEquipment};
pub use error::ResolveError;

use serde::{Deserialize, Serialize};

/// Which strategy produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Direct `customer` label.
    CustomerLabel,
    /// `account_id` label.
    AccountId,
    /// `domain` label.
    Domain,
    /// `client_ip` label matched against customer CIDR ranges.
    IpRange,
    /// Direct `equipment_type` label.
    EquipmentTypeLabel,
    /// `device_type` label.
    DeviceTypeLabel,
    /// `job` label matched against the job pattern table.
    JobPattern,
    /// `instance` label matched against the hostname prefix table.
    HostnamePrefix,
    /// `asn` label.
    Asn,
}

use thiserror::Error;

/// Errors surfaced by the resolver layer.
///
/// Unexpected store failures inside a resolution attempt are logged and
/// the next attempt runs; only exhaustion of every attempt surfaces as
/// one of the `No…Resolved` variants.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no customer resolved from alert labels")]
    NoCustomerResolved,

    #[error("no equipment type resolved from alert labels")]
    NoEquipmentResolved,

    #[error("no carrier resolved from alert labels")]
    NoCarrierResolved,
}

use thiserror::Error;

use siren_cel::CelError;
use siren_store::StoreError;

/// Errors surfaced by the routing pipeline.
///
/// Condition-level failures never surface here; they degrade to a
/// failed [`ConditionResult`](siren_core::ConditionResult) with a
/// recorded reason. These variants cover boundary validation and store
/// access.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The rule store or audit store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A CEL expression failed to compile. Raised only by the test and
    /// simulate surfaces; live routing records the failure in the
    /// condition result instead.
    #[error(transparent)]
    Cel(#[from] CelError),
}

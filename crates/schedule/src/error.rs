use thiserror::Error;

use siren_store::StoreError;

/// Errors raised by on-call computation and handoff handling.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The schedule's timezone is not a valid IANA name.
    #[error("invalid timezone: {0:?}")]
    InvalidTimezone(String),

    /// The schedule has no rotation able to produce an on-call user.
    #[error("schedule {0} has no active rotation")]
    NoActiveRotation(String),

    /// A handoff acknowledgement was attempted by a user who is not
    /// currently on call.
    #[error("user {user_id} is not currently on-call")]
    NotOnCall { user_id: String },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

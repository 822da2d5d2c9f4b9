use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use siren_store::ScheduleStore;

use crate::calculator::{OncallSnapshot, oncall_at};
use crate::error::ScheduleError;

/// Current handoff state of a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffSummary {
    pub schedule_id: String,
    pub primary_user_id: Option<String>,
    pub secondary_user_id: Option<String>,
    pub current_shift: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub next_handoff: Option<DateTime<Utc>>,
    /// Whether the current primary acknowledged since their shift began.
    pub acknowledged: bool,
    /// Recent acknowledgements, newest first, as `(user_id, acked_at)`.
    pub recent_acks: Vec<(String, DateTime<Utc>)>,
}

/// Record a handoff acknowledgement for `user_id`.
///
/// The user must be the current primary or secondary; acknowledgement is
/// advisory and never changes on-call selection.
pub async fn acknowledge_handoff(
    store: &dyn ScheduleStore,
    schedule_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<OncallSnapshot, ScheduleError> {
    let schedule = store.get(schedule_id).await?;
    let snapshot = oncall_at(&schedule, now)?;
    if !snapshot.is_oncall(user_id) {
        return Err(ScheduleError::NotOnCall {
            user_id: user_id.to_owned(),
        });
    }
    store.record_handoff_ack(schedule_id, user_id, now).await?;
    debug!(schedule = schedule_id, user = user_id, "handoff acknowledged");
    Ok(snapshot)
}

/// Build the handoff summary for a schedule at `now`.
pub async fn handoff_summary(
    store: &dyn ScheduleStore,
    schedule_id: &str,
    now: DateTime<Utc>,
) -> Result<HandoffSummary, ScheduleError> {
    let schedule = store.get(schedule_id).await?;
    let snapshot = oncall_at(&schedule, now)?;
    let acks = store.list_handoff_acks(schedule_id).await?;

    let acknowledged = match (&snapshot.primary_user_id, snapshot.current_shift) {
        (Some(primary), Some((shift_start, _))) => acks
            .iter()
            .any(|(user, at)| user == primary && *at >= shift_start),
        _ => false,
    };

    Ok(HandoffSummary {
        schedule_id: schedule_id.to_owned(),
        primary_user_id: snapshot.primary_user_id,
        secondary_user_id: snapshot.secondary_user_id,
        current_shift: snapshot.current_shift,
        next_handoff: snapshot.next_handoff,
        acknowledged,
        recent_acks: acks.into_iter().take(10).collect(),
    })
}

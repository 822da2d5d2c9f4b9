use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use siren_core::{Rotation, Schedule, ScheduleOverride};

use crate::error::ScheduleError;

/// Where an on-call assignment came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShiftSource {
    Rotation { rotation_id: String },
    Override { override_id: String },
}

/// One concrete shift: a user on a layer for `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OncallShift {
    pub user_id: String,
    pub layer: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: ShiftSource,
}

/// The on-call result for a single layer at an instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerOncall {
    pub layer: u32,
    pub user_id: String,
    /// Bounds of the shift that produced this assignment.
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    pub source: ShiftSource,
}

/// Who is on call for a schedule at an instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OncallSnapshot {
    pub schedule_id: String,
    pub at: DateTime<Utc>,
    /// Layer-1 assignment.
    pub primary_user_id: Option<String>,
    /// Layer-2 assignment.
    pub secondary_user_id: Option<String>,
    /// Every layer's assignment, ascending by layer.
    pub layers: Vec<LayerOncall>,
    /// Bounds of the primary shift.
    pub current_shift: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// The earliest future shift boundary across all contributing
    /// rotations and overrides.
    pub next_handoff: Option<DateTime<Utc>>,
}

impl OncallSnapshot {
    /// Whether `user_id` currently holds the primary or secondary slot.
    #[must_use]
    pub fn is_oncall(&self, user_id: &str) -> bool {
        self.primary_user_id.as_deref() == Some(user_id)
            || self.secondary_user_id.as_deref() == Some(user_id)
    }
}

fn parse_tz(schedule: &Schedule) -> Result<Tz, ScheduleError> {
    schedule
        .timezone
        .parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(schedule.timezone.clone()))
}

/// The rotation shift containing `t`, if the rotation has started and
/// has members.
#[allow(clippy::cast_possible_wrap)]
fn rotation_shift_at(rotation: &Rotation, t: DateTime<Utc>) -> Option<OncallShift> {
    if rotation.members.is_empty() || rotation.shift_length_seconds == 0 || t < rotation.start_time
    {
        return None;
    }
    let len = rotation.shift_length_seconds as i64;
    let elapsed = (t - rotation.start_time).num_seconds();
    let shift_index = elapsed.div_euclid(len);
    let mut members = rotation.members.clone();
    members.sort_by_key(|m| m.position);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let member = &members[(shift_index as usize) % members.len()];
    let start = rotation.start_time + Duration::seconds(shift_index * len);
    Some(OncallShift {
        user_id: member.user_id.clone(),
        layer: rotation.layer,
        start,
        end: start + Duration::seconds(len),
        source: ShiftSource::Rotation {
            rotation_id: rotation.id.clone(),
        },
    })
}

/// The override covering `t` on `layer`, if any. When several overlap,
/// the one with the latest start wins.
fn override_at(
    overrides: &[ScheduleOverride],
    layer: u32,
    t: DateTime<Utc>,
) -> Option<OncallShift> {
    overrides
        .iter()
        .filter(|ov| ov.layer == layer && ov.start_time <= t && t < ov.end_time)
        .max_by_key(|ov| ov.start_time)
        .map(|ov| OncallShift {
            user_id: ov.user_id.clone(),
            layer: ov.layer,
            start: ov.start_time,
            end: ov.end_time,
            source: ShiftSource::Override {
                override_id: ov.id.clone(),
            },
        })
}

/// Compute who is on call at instant `t`.
pub fn oncall_at(schedule: &Schedule, t: DateTime<Utc>) -> Result<OncallSnapshot, ScheduleError> {
    // Shift arithmetic below works on absolute instants; the timezone is
    // validated up front so invalid schedules fail loudly rather than
    // silently drifting.
    let _tz = parse_tz(schedule)?;

    let mut layer_numbers: Vec<u32> = schedule.rotations.iter().map(|r| r.layer).collect();
    layer_numbers.extend(schedule.overrides.iter().map(|o| o.layer));
    layer_numbers.sort_unstable();
    layer_numbers.dedup();

    let mut layers = Vec::new();
    for layer in layer_numbers {
        let shift = override_at(&schedule.overrides, layer, t).or_else(|| {
            // First active rotation on the layer, by start time.
            let mut rotations: Vec<&Rotation> = schedule
                .rotations
                .iter()
                .filter(|r| r.layer == layer)
                .collect();
            rotations.sort_by_key(|r| r.start_time);
            rotations.iter().find_map(|r| rotation_shift_at(r, t))
        });
        if let Some(shift) = shift {
            layers.push(LayerOncall {
                layer,
                user_id: shift.user_id,
                shift_start: shift.start,
                shift_end: shift.end,
                source: shift.source,
            });
        }
    }

    // `layers` is ascending, so the first entry is the lowest layer.
    let primary_user_id = layers.first().map(|l| l.user_id.clone());
    let current_shift = layers.first().map(|l| (l.shift_start, l.shift_end));
    let secondary_user_id = layers.get(1).map(|l| l.user_id.clone());

    Ok(OncallSnapshot {
        schedule_id: schedule.id.clone(),
        at: t,
        primary_user_id,
        secondary_user_id,
        layers,
        current_shift,
        next_handoff: next_boundary(schedule, t),
    })
}

/// The earliest boundary strictly after `t` across every rotation and
/// override of the schedule.
#[allow(clippy::cast_possible_wrap)]
fn next_boundary(schedule: &Schedule, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut boundaries: Vec<DateTime<Utc>> = Vec::new();

    for rotation in &schedule.rotations {
        if rotation.members.is_empty() || rotation.shift_length_seconds == 0 {
            continue;
        }
        if t < rotation.start_time {
            boundaries.push(rotation.start_time);
            continue;
        }
        let len = rotation.shift_length_seconds as i64;
        let elapsed = (t - rotation.start_time).num_seconds();
        let next_index = elapsed.div_euclid(len) + 1;
        boundaries.push(rotation.start_time + Duration::seconds(next_index * len));
    }

    for ov in &schedule.overrides {
        if ov.start_time > t {
            boundaries.push(ov.start_time);
        }
        if ov.end_time > t {
            boundaries.push(ov.end_time);
        }
    }

    boundaries.into_iter().filter(|b| *b > t).min()
}

/// Enumerate concrete shifts within `[from, until)`, merging overrides
/// into the rotation timeline. Overrides replace the rotation result on
/// their layer; rotation shifts overlapping an override are trimmed
/// around it. The result is ordered by `start`, then layer.
pub fn upcoming_shifts(
    schedule: &Schedule,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    user_id: Option<&str>,
) -> Result<Vec<OncallShift>, ScheduleError> {
    let _tz = parse_tz(schedule)?;
    let mut shifts: Vec<OncallShift> = Vec::new();

    for rotation in &schedule.rotations {
        let overrides: Vec<&ScheduleOverride> = schedule
            .overrides
            .iter()
            .filter(|ov| ov.layer == rotation.layer)
            .collect();
        for shift in rotation_shifts_in_range(rotation, from, until) {
            shifts.extend(trim_around_overrides(shift, &overrides));
        }
    }

    for ov in &schedule.overrides {
        if ov.end_time > from && ov.start_time < until {
            shifts.push(OncallShift {
                user_id: ov.user_id.clone(),
                layer: ov.layer,
                start: ov.start_time.max(from),
                end: ov.end_time.min(until),
                source: ShiftSource::Override {
                    override_id: ov.id.clone(),
                },
            });
        }
    }

    if let Some(user) = user_id {
        shifts.retain(|s| s.user_id == user);
    }
    shifts.sort_by(|a, b| a.start.cmp(&b.start).then(a.layer.cmp(&b.layer)));
    Ok(shifts)
}

/// Rotation shifts clipped to `[from, until)`.
#[allow(clippy::cast_possible_wrap)]
fn rotation_shifts_in_range(
    rotation: &Rotation,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Vec<OncallShift> {
    let mut out = Vec::new();
    if rotation.members.is_empty() || rotation.shift_length_seconds == 0 || until <= rotation.start_time {
        return out;
    }
    let len = rotation.shift_length_seconds as i64;
    let first_index = if from <= rotation.start_time {
        0
    } else {
        (from - rotation.start_time).num_seconds().div_euclid(len)
    };
    let mut members = rotation.members.clone();
    members.sort_by_key(|m| m.position);

    let mut index = first_index;
    loop {
        let start = rotation.start_time + Duration::seconds(index * len);
        if start >= until {
            break;
        }
        let end = start + Duration::seconds(len);
        if end > from {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let member = &members[(index as usize) % members.len()];
            out.push(OncallShift {
                user_id: member.user_id.clone(),
                layer: rotation.layer,
                start: start.max(from),
                end: end.min(until),
                source: ShiftSource::Rotation {
                    rotation_id: rotation.id.clone(),
                },
            });
        }
        index += 1;
    }
    out
}

/// Remove the parts of a rotation shift covered by overrides on its
/// layer, splitting into the surviving segments.
fn trim_around_overrides(
    shift: OncallShift,
    overrides: &[&ScheduleOverride],
) -> Vec<OncallShift> {
    let mut segments = vec![(shift.start, shift.end)];
    for ov in overrides {
        let mut next = Vec::new();
        for (start, end) in segments {
            if ov.end_time <= start || ov.start_time >= end {
                next.push((start, end));
                continue;
            }
            if ov.start_time > start {
                next.push((start, ov.start_time));
            }
            if ov.end_time < end {
                next.push((ov.end_time, end));
            }
        }
        segments = next;
    }
    segments
        .into_iter()
        .map(|(start, end)| OncallShift {
            user_id: shift.user_id.clone(),
            layer: shift.layer,
            start,
            end,
            source: shift.source.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use siren_core::RotationType;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn daily_schedule() -> Schedule {
        Schedule::new("net-oncall", "UTC").with_rotation(
            Rotation::new(1, RotationType::Daily, utc(2024, 1, 1, 0, 0))
                .with_member("u1")
                .with_member("u2")
                .with_member("u3"),
        )
    }

    #[test]
    fn daily_rotation_cycles_members() {
        let schedule = daily_schedule();
        let snap = oncall_at(&schedule, utc(2024, 1, 2, 12, 0)).unwrap();
        assert_eq!(snap.primary_user_id.as_deref(), Some("u2"));
        assert_eq!(
            snap.current_shift,
            Some((utc(2024, 1, 2, 0, 0), utc(2024, 1, 3, 0, 0)))
        );
        assert_eq!(snap.next_handoff, Some(utc(2024, 1, 3, 0, 0)));

        // k·len + ε lands on members[k mod n] for arbitrary k.
        let snap = oncall_at(&schedule, utc(2024, 1, 7, 1, 0)).unwrap();
        assert_eq!(snap.primary_user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn before_rotation_start_nobody_is_oncall() {
        let schedule = daily_schedule();
        let snap = oncall_at(&schedule, utc(2023, 12, 25, 0, 0)).unwrap();
        assert!(snap.primary_user_id.is_none());
        // The rotation start itself is the next handoff.
        assert_eq!(snap.next_handoff, Some(utc(2024, 1, 1, 0, 0)));
    }

    #[test]
    fn override_wins_over_rotation() {
        let schedule = daily_schedule().with_override(ScheduleOverride::new(
            "relief",
            1,
            utc(2024, 1, 2, 6, 0),
            utc(2024, 1, 2, 18, 0),
        ));
        let snap = oncall_at(&schedule, utc(2024, 1, 2, 12, 0)).unwrap();
        assert_eq!(snap.primary_user_id.as_deref(), Some("relief"));
        assert!(matches!(
            snap.layers[0].source,
            ShiftSource::Override { .. }
        ));

        // Outside the override the rotation result returns.
        let snap = oncall_at(&schedule, utc(2024, 1, 2, 19, 0)).unwrap();
        assert_eq!(snap.primary_user_id.as_deref(), Some("u2"));
    }

    #[test]
    fn latest_starting_override_wins_overlap() {
        let schedule = daily_schedule()
            .with_override(ScheduleOverride::new(
                "early",
                1,
                utc(2024, 1, 2, 0, 0),
                utc(2024, 1, 3, 0, 0),
            ))
            .with_override(ScheduleOverride::new(
                "late",
                1,
                utc(2024, 1, 2, 8, 0),
                utc(2024, 1, 2, 16, 0),
            ));
        let snap = oncall_at(&schedule, utc(2024, 1, 2, 12, 0)).unwrap();
        assert_eq!(snap.primary_user_id.as_deref(), Some("late"));
    }

    #[test]
    fn layers_map_to_primary_and_secondary() {
        let schedule = daily_schedule().with_rotation(
            Rotation::new(2, RotationType::Daily, utc(2024, 1, 1, 0, 0)).with_member("backup"),
        );
        let snap = oncall_at(&schedule, utc(2024, 1, 1, 12, 0)).unwrap();
        assert_eq!(snap.primary_user_id.as_deref(), Some("u1"));
        assert_eq!(snap.secondary_user_id.as_deref(), Some("backup"));
    }

    #[test]
    fn invalid_timezone_rejected() {
        let mut schedule = daily_schedule();
        schedule.timezone = "Mars/Olympus".into();
        assert!(matches!(
            oncall_at(&schedule, utc(2024, 1, 1, 1, 0)).unwrap_err(),
            ScheduleError::InvalidTimezone(_)
        ));
    }

    #[test]
    fn next_handoff_sees_override_boundaries() {
        let schedule = daily_schedule().with_override(ScheduleOverride::new(
            "relief",
            1,
            utc(2024, 1, 1, 6, 0),
            utc(2024, 1, 1, 8, 0),
        ));
        let snap = oncall_at(&schedule, utc(2024, 1, 1, 5, 0)).unwrap();
        assert_eq!(snap.next_handoff, Some(utc(2024, 1, 1, 6, 0)));
        let snap = oncall_at(&schedule, utc(2024, 1, 1, 7, 0)).unwrap();
        assert_eq!(snap.next_handoff, Some(utc(2024, 1, 1, 8, 0)));
    }

    #[test]
    fn upcoming_shifts_enumerates_and_clips() {
        let schedule = daily_schedule();
        let shifts = upcoming_shifts(
            &schedule,
            utc(2024, 1, 1, 12, 0),
            utc(2024, 1, 3, 12, 0),
            None,
        )
        .unwrap();
        let users: Vec<&str> = shifts.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2", "u3"]);
        // Clipped to the query range at both ends.
        assert_eq!(shifts[0].start, utc(2024, 1, 1, 12, 0));
        assert_eq!(shifts[2].end, utc(2024, 1, 3, 12, 0));
    }

    #[test]
    fn upcoming_shifts_splits_around_override() {
        let schedule = daily_schedule().with_override(ScheduleOverride::new(
            "relief",
            1,
            utc(2024, 1, 1, 6, 0),
            utc(2024, 1, 1, 12, 0),
        ));
        let shifts = upcoming_shifts(
            &schedule,
            utc(2024, 1, 1, 0, 0),
            utc(2024, 1, 2, 0, 0),
            None,
        )
        .unwrap();
        let entries: Vec<(&str, DateTime<Utc>, DateTime<Utc>)> = shifts
            .iter()
            .map(|s| (s.user_id.as_str(), s.start, s.end))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("u1", utc(2024, 1, 1, 0, 0), utc(2024, 1, 1, 6, 0)),
                ("relief", utc(2024, 1, 1, 6, 0), utc(2024, 1, 1, 12, 0)),
                ("u1", utc(2024, 1, 1, 12, 0), utc(2024, 1, 2, 0, 0)),
            ]
        );
    }

    #[test]
    fn upcoming_shifts_user_filter() {
        let schedule = daily_schedule();
        let shifts = upcoming_shifts(
            &schedule,
            utc(2024, 1, 1, 0, 0),
            utc(2024, 1, 7, 0, 0),
            Some("u2"),
        )
        .unwrap();
        assert_eq!(shifts.len(), 2);
        assert!(shifts.iter().all(|s| s.user_id == "u2"));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cadence of a rotation's shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationType {
    /// 24-hour shifts.
    Daily,
    /// 7-day shifts.
    Weekly,
    /// Arbitrary `shift_length_seconds`.
    Custom,
}

/// A member of a rotation, ordered by `position` (lowest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationMember {
    pub user_id: String,
    pub position: u32,
}

/// A cyclic on-call assignment across equal-length shifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rotation {
    pub id: String,
    /// Layer this rotation contributes to. Layer 1 is primary on-call,
    /// layer 2 secondary, and so on.
    pub layer: u32,
    pub rotation_type: RotationType,
    /// Instant the first shift starts.
    pub start_time: DateTime<Utc>,
    /// Shift length. Shift arithmetic is integer division on this value.
    pub shift_length_seconds: u64,
    /// Members cycling through the shifts, ordered by `position`.
    pub members: Vec<RotationMember>,
}

impl Rotation {
    /// Create a rotation with the canonical shift length for its type.
    #[must_use]
    pub fn new(layer: u32, rotation_type: RotationType, start_time: DateTime<Utc>) -> Self {
        let shift_length_seconds = match rotation_type {
            RotationType::Daily => 86_400,
            RotationType::Weekly => 604_800,
            RotationType::Custom => 86_400,
        };
        Self {
            id: Uuid::new_v4().to_string(),
            layer,
            rotation_type,
            start_time,
            shift_length_seconds,
            members: Vec::new(),
        }
    }

    /// Override the shift length (for `Custom` rotations).
    #[must_use]
    pub fn with_shift_length(mut self, seconds: u64) -> Self {
        self.shift_length_seconds = seconds;
        self
    }

    /// Append a member at the next position.
    #[must_use]
    pub fn with_member(mut self, user_id: impl Into<String>) -> Self {
        let position = self.members.len() as u32;
        self.members.push(RotationMember {
            user_id: user_id.into(),
            position,
        });
        self
    }
}

/// A manual assignment replacing the rotation result on a layer within
/// `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOverride {
    pub id: String,
    pub user_id: String,
    /// Layer the override applies to.
    pub layer: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ScheduleOverride {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        layer: u32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            layer,
            start_time,
            end_time,
        }
    }
}

/// An on-call schedule: layered rotations plus manual overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    /// IANA timezone all shift arithmetic is performed in.
    pub timezone: String,
    #[serde(default)]
    pub rotations: Vec<Rotation>,
    #[serde(default)]
    pub overrides: Vec<ScheduleOverride>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    #[must_use]
    pub fn new(name: impl Into<String>, timezone: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            timezone: timezone.into(),
            rotations: Vec::new(),
            overrides: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotations.push(rotation);
        self
    }

    /// Append an override.
    #[must_use]
    pub fn with_override(mut self, ov: ScheduleOverride) -> Self {
        self.overrides.push(ov);
        self
    }
}

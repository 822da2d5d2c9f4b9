use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who a single escalation step notifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EscalationTarget {
    User { user_id: String },
    Team { team_id: String },
    /// The current on-call of a schedule at escalation time.
    Schedule { schedule_id: String },
    Channel { target: String },
}

/// What to do when every step (including repeats) has run without
/// acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedAction {
    Stop,
    Repeat,
    NotifyFallback,
    CreateIncident,
}

/// One step of an escalation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationStep {
    /// Position in the policy, starting at 0.
    pub step_number: u32,
    /// Delay before this step fires, measured from the previous step.
    pub delay_seconds: u64,
    /// Targets notified when the step fires.
    pub targets: Vec<EscalationTarget>,
}

/// An ordered escalation ladder applied to unacknowledged alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub id: String,
    pub name: String,
    /// Steps in `step_number` order.
    pub steps: Vec<EscalationStep>,
    /// How many times the whole ladder repeats after the last step.
    #[serde(default)]
    pub repeat_count: u32,
    /// Behaviour after steps and repeats are exhausted.
    pub exhausted_action: Option<ExhaustedAction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscalationPolicy {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            steps: Vec::new(),
            repeat_count: 0,
            exhausted_action: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a step numbered after the current last step.
    #[must_use]
    pub fn with_step(mut self, delay_seconds: u64, targets: Vec<EscalationTarget>) -> Self {
        let step_number = self.steps.len() as u32;
        self.steps.push(EscalationStep {
            step_number,
            delay_seconds,
            targets,
        });
        self
    }
}

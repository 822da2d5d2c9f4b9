use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which members of a team receive a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyScope {
    /// Every member of the team.
    All,
    /// Whoever the team's schedule puts on call right now.
    Oncall,
    /// The primary on-call only.
    Primary,
}

/// Which on-call layer a `notify_oncall` action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OncallLevel {
    Primary,
    Secondary,
}

/// A side-effect directive attached to a routing rule.
///
/// The executor dispatches each variant to a registered handler; the
/// variant tag is the registry key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Notify a team through its configured channel.
    NotifyTeam {
        team_id: String,
        scope: NotifyScope,
        template_id: Option<String>,
    },
    /// Notify a named channel (e.g. `"#network-alerts"`).
    NotifyChannel {
        target: String,
        template_id: Option<String>,
    },
    /// Notify a specific user.
    NotifyUser {
        user_id: String,
        channel_override: Option<String>,
        template_id: Option<String>,
    },
    /// Resolve the current on-call from a schedule and notify them.
    NotifyOncall {
        schedule_id: String,
        level: OncallLevel,
        template_id: Option<String>,
    },
    /// Suppress the alert. Recorded in the routing response; does not
    /// abort evaluation of later rules.
    Suppress {
        reason: String,
        duration_seconds: Option<u64>,
        log_suppression: bool,
    },
    /// Hold the alert for windowed aggregation.
    Aggregate {
        group_by: Vec<String>,
        window_seconds: u64,
        max_alerts: u32,
    },
    /// Start an escalation along a policy.
    Escalate {
        policy_id: String,
        start_at_step: u32,
        urgent: bool,
    },
    /// Create a ticket in an external tracker.
    CreateTicket {
        provider: String,
        project_key: String,
        ticket_type: String,
        #[serde(default)]
        fields: HashMap<String, String>,
        template_id: Option<String>,
    },
    /// Set labels on the alert.
    SetLabels {
        labels: HashMap<String, String>,
        overwrite_existing: bool,
    },
}

impl Action {
    /// The stable tag used for handler registration and audit records.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotifyTeam { .. } => "notify_team",
            Self::NotifyChannel { .. } => "notify_channel",
            Self::NotifyUser { .. } => "notify_user",
            Self::NotifyOncall { .. } => "notify_oncall",
            Self::Suppress { .. } => "suppress",
            Self::Aggregate { .. } => "aggregate",
            Self::Escalate { .. } => "escalate",
            Self::CreateTicket { .. } => "create_ticket",
            Self::SetLabels { .. } => "set_labels",
        }
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a maintenance window.
///
/// Legal transitions: `Scheduled → InProgress → Completed`, with
/// `Cancelled` reachable from either non-terminal state. `Completed` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl WindowStatus {
    /// Whether a transition from `self` to `next` is legal.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Scheduled | Self::InProgress, Self::Cancelled)
        )
    }

    /// Whether the status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// What to do with alerts that match an active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceAction {
    /// Drop notifications entirely.
    Suppress,
    /// Deliver notifications but flag them as maintenance-related.
    NotifyOnly,
}

/// A planned interval during which matching alerts are suppressed or
/// demoted to notify-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: WindowStatus,
    pub action: MaintenanceAction,
    /// Site codes the window covers. Empty means no site restriction.
    #[serde(default)]
    pub affected_sites: Vec<String>,
    /// Service names the window covers. Empty means no service
    /// restriction.
    #[serde(default)]
    pub affected_services: Vec<String>,
    /// Label selectors an alert must carry to match. Empty means no
    /// label restriction.
    #[serde(default)]
    pub label_selectors: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceWindow {
    /// Create a `Scheduled` window.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        action: MaintenanceAction,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            start_time,
            end_time,
            status: WindowStatus::Scheduled,
            action,
            affected_sites: Vec::new(),
            affected_services: Vec::new(),
            label_selectors: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Restrict the window to the given sites.
    #[must_use]
    pub fn with_sites(mut self, sites: Vec<String>) -> Self {
        self.affected_sites = sites;
        self
    }

    /// Restrict the window to the given services.
    #[must_use]
    pub fn with_services(mut self, services: Vec<String>) -> Self {
        self.affected_services = services;
        self
    }

    /// Require the given label selectors.
    #[must_use]
    pub fn with_label_selectors(mut self, selectors: HashMap<String, String>) -> Self {
        self.label_selectors = selectors;
        self
    }

    /// Whether the window has no target restriction at all, in which
    /// case it covers every alert while active.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        self.affected_sites.is_empty()
            && self.affected_services.is_empty()
            && self.label_selectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn legal_transitions() {
        use WindowStatus::{Cancelled, Completed, InProgress, Scheduled};
        assert!(Scheduled.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));

        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
        assert!(!Scheduled.can_transition_to(Completed));
    }

    #[test]
    fn terminal_states() {
        assert!(WindowStatus::Completed.is_terminal());
        assert!(WindowStatus::Cancelled.is_terminal());
        assert!(!WindowStatus::InProgress.is_terminal());
    }

    #[test]
    fn unscoped_detection() {
        let now = Utc::now();
        let window = MaintenanceWindow::new(
            "core upgrade",
            now,
            now + Duration::hours(2),
            MaintenanceAction::Suppress,
        );
        assert!(window.is_unscoped());
        let scoped = window.with_sites(vec!["us-east-1".into()]);
        assert!(!scoped.is_unscoped());
    }
}

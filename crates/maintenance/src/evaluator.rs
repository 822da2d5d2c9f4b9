use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use siren_core::{Alert, MaintenanceAction, MaintenanceWindow, WindowStatus};
use siren_store::{MaintenanceWindowStore, StoreError};

use crate::sweeper::refresh_statuses;

/// Result of checking an alert against active maintenance windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceCheck {
    pub in_maintenance: bool,
    /// Windows the alert matched, ordered by start time.
    pub matching_windows: Vec<MaintenanceWindow>,
    /// `Suppress` wins over `NotifyOnly` when several windows match.
    pub recommended_action: Option<MaintenanceAction>,
}

impl MaintenanceCheck {
    fn clear() -> Self {
        Self {
            in_maintenance: false,
            matching_windows: Vec::new(),
            recommended_action: None,
        }
    }
}

/// Evaluates alerts against the maintenance window store.
pub struct MaintenanceEvaluator {
    store: Arc<dyn MaintenanceWindowStore>,
}

impl MaintenanceEvaluator {
    #[must_use]
    pub fn new(store: Arc<dyn MaintenanceWindowStore>) -> Self {
        Self { store }
    }

    /// Check whether `alert` falls under an active window at `now`.
    ///
    /// Statuses are refreshed first so the answer tracks wall-clock time
    /// even between sweeper ticks.
    pub async fn check_alert(
        &self,
        alert: &Alert,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceCheck, StoreError> {
        refresh_statuses(self.store.as_ref(), now).await?;

        let active = self.store.list_by_status(WindowStatus::InProgress).await?;
        let mut matching: Vec<MaintenanceWindow> = active
            .into_iter()
            .filter(|w| w.start_time <= now && now < w.end_time)
            .filter(|w| window_matches_alert(w, alert))
            .collect();
        matching.sort_by(|a, b| a.start_time.cmp(&b.start_time));

        if matching.is_empty() {
            return Ok(MaintenanceCheck::clear());
        }

        let recommended = if matching
            .iter()
            .any(|w| w.action == MaintenanceAction::Suppress)
        {
            MaintenanceAction::Suppress
        } else {
            MaintenanceAction::NotifyOnly
        };
        debug!(
            alert = %alert.id,
            windows = matching.len(),
            action = ?recommended,
            "alert is under maintenance"
        );
        Ok(MaintenanceCheck {
            in_maintenance: true,
            matching_windows: matching,
            recommended_action: Some(recommended),
        })
    }

    /// Active windows, optionally filtered by site or service.
    pub async fn active_windows(
        &self,
        now: DateTime<Utc>,
        site_codes: &[String],
        services: &[String],
    ) -> Result<Vec<MaintenanceWindow>, StoreError> {
        refresh_statuses(self.store.as_ref(), now).await?;
        let mut windows = self.store.list_by_status(WindowStatus::InProgress).await?;
        if !site_codes.is_empty() {
            windows.retain(|w| w.affected_sites.iter().any(|s| site_codes.contains(s)));
        }
        if !services.is_empty() {
            windows.retain(|w| w.affected_services.iter().any(|s| services.contains(s)));
        }
        Ok(windows)
    }
}

/// Whether a window's selectors match an alert.
///
/// A window matches when its site selector, service selector, or label
/// selector matches; empty selector sets are ignored rather than
/// matching everything. A window with no selectors at all is unscoped
/// and covers every alert.
fn window_matches_alert(window: &MaintenanceWindow, alert: &Alert) -> bool {
    if window.is_unscoped() {
        return true;
    }

    let site_match = !window.affected_sites.is_empty()
        && alert
            .label("site")
            .is_some_and(|site| window.affected_sites.iter().any(|s| s == site));

    let service_match = !window.affected_services.is_empty()
        && alert
            .label("service")
            .is_some_and(|svc| window.affected_services.iter().any(|s| s == svc));

    let label_match = !window.label_selectors.is_empty()
        && window
            .label_selectors
            .iter()
            .all(|(k, v)| alert.label(k) == Some(v.as_str()));

    site_match || service_match || label_match
}

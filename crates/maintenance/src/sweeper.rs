use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use siren_core::WindowStatus;
use siren_store::{MaintenanceWindowStore, StoreError};

/// Promote window statuses against wall-clock time.
///
/// `Scheduled` windows whose start has passed become `InProgress`;
/// `InProgress` windows whose end has passed become `Completed`. A
/// window created after its whole interval already elapsed walks both
/// transitions in one sweep. Returns the number of transitions applied.
pub async fn refresh_statuses(
    store: &dyn MaintenanceWindowStore,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let mut transitions = 0;

    for window in store.list_by_status(WindowStatus::Scheduled).await? {
        if window.start_time <= now {
            store.set_status(&window.id, WindowStatus::InProgress).await?;
            debug!(window = %window.id, "maintenance window started");
            transitions += 1;
        }
    }

    for window in store.list_by_status(WindowStatus::InProgress).await? {
        if window.end_time <= now {
            store.set_status(&window.id, WindowStatus::Completed).await?;
            debug!(window = %window.id, "maintenance window completed");
            transitions += 1;
        }
    }

    Ok(transitions)
}

/// Background task driving [`refresh_statuses`] on a fixed interval.
///
/// [`StatusSweeper::stop`] is idempotent; dropping the sweeper also
/// stops the task.
pub struct StatusSweeper {
    stop: watch::Sender<bool>,
}

impl StatusSweeper {
    /// Spawn a sweeper ticking every `interval` (clamped to at most one
    /// second, the rate the lifecycle guarantees).
    #[must_use]
    pub fn spawn(store: Arc<dyn MaintenanceWindowStore>, interval: Duration) -> Self {
        let interval = interval.min(Duration::from_secs(1));
        let (stop, mut stopped) = watch::channel(false);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = refresh_statuses(store.as_ref(), Utc::now()).await {
                            warn!(error = %e, "maintenance status sweep failed");
                        }
                    }
                    _ = stopped.changed() => {
                        if *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        Self { stop }
    }

    /// Signal the sweeper task to exit. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

impl Drop for StatusSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

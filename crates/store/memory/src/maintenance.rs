use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use siren_core::{MaintenanceWindow, WindowStatus};
use siren_store::page::paginate;
use siren_store::{MaintenanceWindowStore, Page, PageRequest, StoreError};

use crate::{read_guard, write_guard};

/// In-memory maintenance window store enforcing the status state machine.
#[derive(Debug, Default)]
pub struct InMemoryMaintenanceWindowStore {
    windows: RwLock<HashMap<String, MaintenanceWindow>>,
}

impl InMemoryMaintenanceWindowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MaintenanceWindowStore for InMemoryMaintenanceWindowStore {
    async fn create(&self, window: MaintenanceWindow) -> Result<MaintenanceWindow, StoreError> {
        if window.end_time <= window.start_time {
            return Err(StoreError::Invalid("window interval".into()));
        }
        write_guard(self.windows.write()).insert(window.id.clone(), window.clone());
        Ok(window)
    }

    async fn get(&self, id: &str) -> Result<MaintenanceWindow, StoreError> {
        read_guard(self.windows.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("maintenance window", id))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<MaintenanceWindow>, StoreError> {
        let mut windows: Vec<MaintenanceWindow> =
            read_guard(self.windows.read()).values().cloned().collect();
        windows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        paginate(windows, page)
    }

    async fn list_by_status(
        &self,
        status: WindowStatus,
    ) -> Result<Vec<MaintenanceWindow>, StoreError> {
        let mut windows: Vec<MaintenanceWindow> = read_guard(self.windows.read())
            .values()
            .filter(|w| w.status == status)
            .cloned()
            .collect();
        windows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(windows)
    }

    async fn update(&self, mut window: MaintenanceWindow) -> Result<MaintenanceWindow, StoreError> {
        let mut windows = write_guard(self.windows.write());
        let existing = windows
            .get(&window.id)
            .ok_or_else(|| StoreError::not_found("maintenance window", &window.id))?;
        // Status changes go through set_status; update keeps the stored one.
        window.status = existing.status;
        window.created_at = existing.created_at;
        window.updated_at = Utc::now();
        windows.insert(window.id.clone(), window.clone());
        Ok(window)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.windows.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("maintenance window", id))
    }

    async fn set_status(
        &self,
        id: &str,
        status: WindowStatus,
    ) -> Result<MaintenanceWindow, StoreError> {
        let mut windows = write_guard(self.windows.write());
        let window = windows
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("maintenance window", id))?;
        if !window.status.can_transition_to(status) {
            return Err(StoreError::Invalid("status".into()));
        }
        window.status = status;
        window.updated_at = Utc::now();
        Ok(window.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use siren_core::MaintenanceAction;

    fn window() -> MaintenanceWindow {
        let now = Utc::now();
        MaintenanceWindow::new(
            "fiber splice",
            now,
            now + Duration::hours(4),
            MaintenanceAction::Suppress,
        )
    }

    #[tokio::test]
    async fn status_machine_enforced() {
        let store = InMemoryMaintenanceWindowStore::new();
        let w = store.create(window()).await.unwrap();

        let w = store.set_status(&w.id, WindowStatus::InProgress).await.unwrap();
        assert_eq!(w.status, WindowStatus::InProgress);

        let w = store.set_status(&w.id, WindowStatus::Completed).await.unwrap();
        assert_eq!(w.status, WindowStatus::Completed);

        // Cancelling a completed window is an invariant violation.
        let err = store
            .set_status(&w.id, WindowStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn inverted_interval_rejected() {
        let store = InMemoryMaintenanceWindowStore::new();
        let now = Utc::now();
        let bad = MaintenanceWindow::new(
            "bad",
            now,
            now - Duration::hours(1),
            MaintenanceAction::NotifyOnly,
        );
        assert!(matches!(
            store.create(bad).await.unwrap_err(),
            StoreError::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let store = InMemoryMaintenanceWindowStore::new();
        let a = store.create(window()).await.unwrap();
        store.create(window()).await.unwrap();
        store.set_status(&a.id, WindowStatus::InProgress).await.unwrap();

        let active = store.list_by_status(WindowStatus::InProgress).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);
    }
}

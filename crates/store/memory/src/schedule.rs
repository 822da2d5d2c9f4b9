use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use siren_core::Schedule;
use siren_store::page::paginate;
use siren_store::{Page, PageRequest, ScheduleStore, StoreError};

use crate::{read_guard, write_guard};

/// In-memory schedule store with a per-schedule handoff ack trail.
#[derive(Debug, Default)]
pub struct InMemoryScheduleStore {
    schedules: RwLock<HashMap<String, Schedule>>,
    acks: RwLock<HashMap<String, Vec<(String, DateTime<Utc>)>>>,
}

impl InMemoryScheduleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn create(&self, schedule: Schedule) -> Result<Schedule, StoreError> {
        if schedule.timezone.is_empty() {
            return Err(StoreError::Invalid("timezone".into()));
        }
        write_guard(self.schedules.write()).insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    async fn get(&self, id: &str) -> Result<Schedule, StoreError> {
        read_guard(self.schedules.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("schedule", id))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Schedule>, StoreError> {
        let mut schedules: Vec<Schedule> =
            read_guard(self.schedules.read()).values().cloned().collect();
        schedules.sort_by(|a, b| a.name.cmp(&b.name));
        paginate(schedules, page)
    }

    async fn update(&self, mut schedule: Schedule) -> Result<Schedule, StoreError> {
        let mut schedules = write_guard(self.schedules.write());
        let existing = schedules
            .get(&schedule.id)
            .ok_or_else(|| StoreError::not_found("schedule", &schedule.id))?;
        schedule.created_at = existing.created_at;
        schedule.updated_at = Utc::now();
        schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.acks.write()).remove(id);
        write_guard(self.schedules.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("schedule", id))
    }

    async fn record_handoff_ack(
        &self,
        schedule_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if !read_guard(self.schedules.read()).contains_key(schedule_id) {
            return Err(StoreError::not_found("schedule", schedule_id));
        }
        write_guard(self.acks.write())
            .entry(schedule_id.to_owned())
            .or_default()
            .push((user_id.to_owned(), at));
        Ok(())
    }

    async fn list_handoff_acks(
        &self,
        schedule_id: &str,
    ) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        if !read_guard(self.schedules.read()).contains_key(schedule_id) {
            return Err(StoreError::not_found("schedule", schedule_id));
        }
        let mut acks = read_guard(self.acks.read())
            .get(schedule_id)
            .cloned()
            .unwrap_or_default();
        acks.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn crud_roundtrip() {
        let store = InMemoryScheduleStore::new();
        let schedule = Schedule::new("net-oncall", "UTC");
        let created = store.create(schedule).await.unwrap();
        assert_eq!(store.get(&created.id).await.unwrap().name, "net-oncall");

        store.delete(&created.id).await.unwrap();
        assert!(store.get(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn acks_newest_first() {
        let store = InMemoryScheduleStore::new();
        let schedule = store.create(Schedule::new("s", "UTC")).await.unwrap();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::minutes(5);
        store.record_handoff_ack(&schedule.id, "u1", t1).await.unwrap();
        store.record_handoff_ack(&schedule.id, "u2", t2).await.unwrap();

        let acks = store.list_handoff_acks(&schedule.id).await.unwrap();
        assert_eq!(acks[0].0, "u2");
        assert_eq!(acks[1].0, "u1");
    }

    #[tokio::test]
    async fn ack_on_unknown_schedule_fails() {
        let store = InMemoryScheduleStore::new();
        let err = store
            .record_handoff_ack("missing", "u1", Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

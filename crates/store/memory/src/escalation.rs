use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use siren_core::EscalationPolicy;
use siren_store::page::paginate;
use siren_store::{ActiveEscalationStore, EscalationPolicyStore, Page, PageRequest, StoreError};

use crate::{read_guard, write_guard};

/// In-memory escalation policy store.
#[derive(Debug, Default)]
pub struct InMemoryEscalationPolicyStore {
    policies: RwLock<HashMap<String, EscalationPolicy>>,
}

impl InMemoryEscalationPolicyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EscalationPolicyStore for InMemoryEscalationPolicyStore {
    async fn create(&self, policy: EscalationPolicy) -> Result<EscalationPolicy, StoreError> {
        if policy.steps.is_empty() {
            return Err(StoreError::Invalid("policy steps".into()));
        }
        write_guard(self.policies.write()).insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn get(&self, id: &str) -> Result<EscalationPolicy, StoreError> {
        read_guard(self.policies.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("escalation policy", id))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<EscalationPolicy>, StoreError> {
        let mut policies: Vec<EscalationPolicy> =
            read_guard(self.policies.read()).values().cloned().collect();
        policies.sort_by(|a, b| a.name.cmp(&b.name));
        paginate(policies, page)
    }

    async fn update(&self, mut policy: EscalationPolicy) -> Result<EscalationPolicy, StoreError> {
        let mut policies = write_guard(self.policies.write());
        let existing = policies
            .get(&policy.id)
            .ok_or_else(|| StoreError::not_found("escalation policy", &policy.id))?;
        policy.created_at = existing.created_at;
        policy.updated_at = Utc::now();
        policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.policies.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("escalation policy", id))
    }
}

/// Stub backend for the active-escalation runtime, which is not part of
/// this service. Every call fails with the stable unimplemented error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedActiveEscalationStore;

#[async_trait]
impl ActiveEscalationStore for UnimplementedActiveEscalationStore {
    async fn start(&self, _alert_id: &str, _policy_id: &str) -> Result<String, StoreError> {
        Err(StoreError::Unimplemented("active escalation runtime"))
    }

    async fn get(&self, _escalation_id: &str) -> Result<serde_json::Value, StoreError> {
        Err(StoreError::Unimplemented("active escalation runtime"))
    }

    async fn cancel(&self, _escalation_id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unimplemented("active escalation runtime"))
    }
}

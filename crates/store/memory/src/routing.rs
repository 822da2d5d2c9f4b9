use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use siren_core::{AuditLog, AuditQuery, RoutingRule};
use siren_store::{Page, PageRequest, RoutingRuleStore, StoreError};
use siren_store::page::paginate;

use crate::{read_guard, write_guard};

/// In-memory routing rule store.
///
/// A single `RwLock` guards the whole map so that `reorder` can apply a
/// batch of priority changes atomically with respect to concurrent
/// readers.
#[derive(Debug, Default)]
pub struct InMemoryRoutingRuleStore {
    rules: RwLock<HashMap<String, RoutingRule>>,
}

impl InMemoryRoutingRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered(rules: &HashMap<String, RoutingRule>, enabled_only: bool) -> Vec<RoutingRule> {
        let mut out: Vec<RoutingRule> = rules
            .values()
            .filter(|r| !enabled_only || r.enabled)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        out
    }

    /// Duplicate-priority check among enabled rules, excluding `skip_id`.
    fn check_priority(
        rules: &HashMap<String, RoutingRule>,
        priority: i32,
        enabled: bool,
        skip_id: &str,
    ) -> Result<(), StoreError> {
        if !enabled {
            return Ok(());
        }
        let clash = rules
            .values()
            .any(|r| r.enabled && r.priority == priority && r.id != skip_id);
        if clash {
            return Err(StoreError::duplicate("priority", priority));
        }
        Ok(())
    }
}

#[async_trait]
impl RoutingRuleStore for InMemoryRoutingRuleStore {
    async fn create(&self, rule: RoutingRule) -> Result<RoutingRule, StoreError> {
        if rule.name.is_empty() {
            return Err(StoreError::Invalid("rule name".into()));
        }
        let mut rules = write_guard(self.rules.write());
        Self::check_priority(&rules, rule.priority, rule.enabled, &rule.id)?;
        rules.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn get(&self, id: &str) -> Result<RoutingRule, StoreError> {
        read_guard(self.rules.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("routing rule", id))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<RoutingRule>, StoreError> {
        let rules = Self::ordered(&read_guard(self.rules.read()), false);
        paginate(rules, page)
    }

    async fn list_enabled(&self) -> Result<Vec<RoutingRule>, StoreError> {
        Ok(Self::ordered(&read_guard(self.rules.read()), true))
    }

    async fn list_all_ordered(&self) -> Result<Vec<RoutingRule>, StoreError> {
        Ok(Self::ordered(&read_guard(self.rules.read()), false))
    }

    async fn update(&self, mut rule: RoutingRule) -> Result<RoutingRule, StoreError> {
        let mut rules = write_guard(self.rules.write());
        let existing = rules
            .get(&rule.id)
            .ok_or_else(|| StoreError::not_found("routing rule", &rule.id))?;
        Self::check_priority(&rules, rule.priority, rule.enabled, &rule.id)?;
        rule.created_at = existing.created_at;
        rule.updated_at = Utc::now();
        rules.insert(rule.id.clone(), rule.clone());
        Ok(rule)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.rules.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("routing rule", id))
    }

    async fn reorder(
        &self,
        priorities: &HashMap<String, i32>,
    ) -> Result<Vec<RoutingRule>, StoreError> {
        let mut rules = write_guard(self.rules.write());

        // Validate ids before touching anything.
        for id in priorities.keys() {
            if !rules.contains_key(id) {
                return Err(StoreError::not_found("routing rule", id));
            }
        }

        // Apply to a scratch copy; the constraint is checked against the
        // final state, not per entry.
        let mut next: HashMap<String, RoutingRule> = (*rules).clone();
        let now = Utc::now();
        for (id, priority) in priorities {
            if let Some(rule) = next.get_mut(id) {
                rule.priority = *priority;
                rule.updated_at = now;
            }
        }
        let mut seen: HashMap<i32, &str> = HashMap::new();
        for rule in next.values().filter(|r| r.enabled) {
            if seen.insert(rule.priority, &rule.id).is_some() {
                return Err(StoreError::duplicate("priority", rule.priority));
            }
        }

        *rules = next;
        let mut updated: Vec<RoutingRule> = priorities
            .keys()
            .filter_map(|id| rules.get(id).cloned())
            .collect();
        updated.sort_by_key(|r| r.priority);
        Ok(updated)
    }

    async fn record_match(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut rules = write_guard(self.rules.write());
        let rule = rules
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("routing rule", id))?;
        rule.match_count += 1;
        rule.last_matched_at = Some(at);
        Ok(())
    }
}

/// In-memory audit log store, newest records first on query.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogStore {
    logs: RwLock<Vec<AuditLog>>,
}

impl InMemoryAuditLogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(log: &AuditLog, query: &AuditQuery) -> bool {
        if let Some(ref alert_id) = query.alert_id
            && log.alert_id != *alert_id
        {
            return false;
        }
        if let Some(ref rule_id) = query.rule_id
            && !log.evaluations.iter().any(|e| e.rule_id == *rule_id)
        {
            return false;
        }
        if query.matched_only && !log.evaluations.iter().any(|e| e.matched) {
            return false;
        }
        if let Some(from) = query.from
            && log.timestamp < from
        {
            return false;
        }
        if let Some(until) = query.until
            && log.timestamp >= until
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl siren_store::AuditLogStore for InMemoryAuditLogStore {
    async fn append(&self, log: AuditLog) -> Result<(), StoreError> {
        write_guard(self.logs.write()).push(log);
        Ok(())
    }

    async fn query(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> Result<Page<AuditLog>, StoreError> {
        let mut hits: Vec<AuditLog> = read_guard(self.logs.read())
            .iter()
            .filter(|log| Self::matches(log, query))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        paginate(hits, page)
    }
}

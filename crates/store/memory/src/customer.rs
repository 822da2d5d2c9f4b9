use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use siren_core::{Customer, CustomerTier, IpRange};
use siren_store::page::paginate;
use siren_store::{CustomerStore, CustomerTierStore, Page, PageRequest, StoreError};

use crate::{read_guard, write_guard};

/// In-memory customer tier store. `name` and `level` are unique.
#[derive(Debug, Default)]
pub struct InMemoryCustomerTierStore {
    tiers: RwLock<HashMap<String, CustomerTier>>,
}

impl InMemoryCustomerTierStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        tiers: &HashMap<String, CustomerTier>,
        tier: &CustomerTier,
    ) -> Result<(), StoreError> {
        for other in tiers.values() {
            if other.id == tier.id {
                continue;
            }
            if other.name == tier.name {
                return Err(StoreError::duplicate("name", &tier.name));
            }
            if other.level == tier.level {
                return Err(StoreError::duplicate("level", tier.level));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CustomerTierStore for InMemoryCustomerTierStore {
    async fn create(&self, tier: CustomerTier) -> Result<CustomerTier, StoreError> {
        if tier.name.is_empty() {
            return Err(StoreError::Invalid("tier name".into()));
        }
        let mut tiers = write_guard(self.tiers.write());
        Self::check_unique(&tiers, &tier)?;
        tiers.insert(tier.id.clone(), tier.clone());
        Ok(tier)
    }

    async fn get(&self, id: &str) -> Result<CustomerTier, StoreError> {
        read_guard(self.tiers.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("customer tier", id))
    }

    async fn get_by_level(&self, level: u32) -> Result<CustomerTier, StoreError> {
        read_guard(self.tiers.read())
            .values()
            .find(|t| t.level == level)
            .cloned()
            .ok_or_else(|| StoreError::not_found("customer tier", format!("level {level}")))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<CustomerTier>, StoreError> {
        let mut tiers: Vec<CustomerTier> =
            read_guard(self.tiers.read()).values().cloned().collect();
        tiers.sort_by_key(|t| t.level);
        paginate(tiers, page)
    }

    async fn update(&self, mut tier: CustomerTier) -> Result<CustomerTier, StoreError> {
        let mut tiers = write_guard(self.tiers.write());
        let existing = tiers
            .get(&tier.id)
            .ok_or_else(|| StoreError::not_found("customer tier", &tier.id))?;
        Self::check_unique(&tiers, &tier)?;
        tier.created_at = existing.created_at;
        tier.updated_at = Utc::now();
        tiers.insert(tier.id.clone(), tier.clone());
        Ok(tier)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.tiers.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("customer tier", id))
    }
}

/// In-memory customer store. `account_id` is unique.
#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<HashMap<String, Customer>>,
}

impl InMemoryCustomerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn create(&self, customer: Customer) -> Result<Customer, StoreError> {
        if customer.account_id.is_empty() {
            return Err(StoreError::Invalid("account_id".into()));
        }
        let mut customers = write_guard(self.customers.write());
        if customers
            .values()
            .any(|c| c.account_id == customer.account_id)
        {
            return Err(StoreError::duplicate("account_id", &customer.account_id));
        }
        customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn get(&self, id: &str) -> Result<Customer, StoreError> {
        read_guard(self.customers.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("customer", id))
    }

    async fn get_by_account_id(&self, account_id: &str) -> Result<Customer, StoreError> {
        read_guard(self.customers.read())
            .values()
            .find(|c| c.account_id == account_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("customer", account_id))
    }

    async fn get_by_domain(&self, domain: &str) -> Result<Customer, StoreError> {
        read_guard(self.customers.read())
            .values()
            .find(|c| c.domains.iter().any(|d| d.eq_ignore_ascii_case(domain)))
            .cloned()
            .ok_or_else(|| StoreError::not_found("customer", domain))
    }

    async fn get_by_ip(&self, addr: IpAddr) -> Result<Customer, StoreError> {
        let customers = read_guard(self.customers.read());
        for customer in customers.values() {
            for cidr in &customer.ip_ranges {
                // Malformed stored ranges are skipped rather than failing
                // the whole scan.
                let Ok(range) = cidr.parse::<IpRange>() else {
                    continue;
                };
                if range.contains(addr) {
                    return Ok(customer.clone());
                }
            }
        }
        Err(StoreError::not_found("customer", addr.to_string()))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Customer>, StoreError> {
        let mut customers: Vec<Customer> =
            read_guard(self.customers.read()).values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        paginate(customers, page)
    }

    async fn update(&self, mut customer: Customer) -> Result<Customer, StoreError> {
        let mut customers = write_guard(self.customers.write());
        let existing = customers
            .get(&customer.id)
            .ok_or_else(|| StoreError::not_found("customer", &customer.id))?;
        if customers
            .values()
            .any(|c| c.account_id == customer.account_id && c.id != customer.id)
        {
            return Err(StoreError::duplicate("account_id", &customer.account_id));
        }
        customer.created_at = existing.created_at;
        customer.updated_at = Utc::now();
        customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.customers.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("customer", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tier_uniqueness() {
        let store = InMemoryCustomerTierStore::new();
        store.create(CustomerTier::new("gold", 2)).await.unwrap();

        let err = store.create(CustomerTier::new("gold", 3)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "name", .. }));

        let err = store
            .create(CustomerTier::new("silver", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "level", .. }));
    }

    #[tokio::test]
    async fn customer_alt_key_lookups() {
        let store = InMemoryCustomerStore::new();
        let customer = Customer::new("Acme", "acct-1", "tier-1")
            .with_domain("acme.example")
            .with_ip_range("10.0.0.0/8");
        store.create(customer.clone()).await.unwrap();

        assert_eq!(
            store.get_by_account_id("acct-1").await.unwrap().id,
            customer.id
        );
        assert_eq!(
            store.get_by_domain("ACME.example").await.unwrap().id,
            customer.id
        );
        assert_eq!(
            store
                .get_by_ip("10.20.30.40".parse().unwrap())
                .await
                .unwrap()
                .id,
            customer.id
        );
        assert!(store
            .get_by_ip("192.168.1.1".parse().unwrap())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn malformed_ip_range_is_skipped() {
        let store = InMemoryCustomerStore::new();
        let broken = Customer::new("Broken", "acct-2", "tier-1").with_ip_range("not-a-cidr");
        let good = Customer::new("Good", "acct-3", "tier-1").with_ip_range("172.16.0.0/12");
        store.create(broken).await.unwrap();
        store.create(good.clone()).await.unwrap();

        let hit = store.get_by_ip("172.16.5.5".parse().unwrap()).await.unwrap();
        assert_eq!(hit.id, good.id);
    }

    #[tokio::test]
    async fn duplicate_account_id_rejected() {
        let store = InMemoryCustomerStore::new();
        store
            .create(Customer::new("A", "acct-1", "tier-1"))
            .await
            .unwrap();
        let err = store
            .create(Customer::new("B", "acct-1", "tier-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Duplicate {
                field: "account_id",
                ..
            }
        ));
    }
}

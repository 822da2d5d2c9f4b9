use std::net::IpAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use siren_core::{Alert, Customer, TierConfig};
use siren_store::{CustomerStore, CustomerTierStore};

use crate::ResolutionMethod;
use crate::cache::{CacheSweeper, ResolverConfig, TtlCache};
use crate::error::ResolveError;

/// A customer resolution and how it was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCustomer {
    pub customer: Customer,
    pub method: ResolutionMethod,
    /// The label value the winning strategy matched on.
    pub matched_value: String,
}

/// Resolves customers from alert labels.
///
/// Attempt order: direct `customer` label, `account_id` label, `domain`
/// label, then `client_ip` CIDR scan. The first hit wins; not-found
/// moves to the next attempt; unexpected store errors are logged and
/// the next attempt runs anyway.
pub struct CustomerResolver {
    store: Arc<dyn CustomerStore>,
    tiers: Arc<dyn CustomerTierStore>,
    cache: Arc<TtlCache<Customer>>,
    sweeper: CacheSweeper,
}

impl CustomerResolver {
    /// Build a resolver and start its cache sweeper.
    #[must_use]
    pub fn new(
        store: Arc<dyn CustomerStore>,
        tiers: Arc<dyn CustomerTierStore>,
        config: &ResolverConfig,
    ) -> Self {
        let cache = Arc::new(TtlCache::new(config.cache_ttl));
        let sweeper = CacheSweeper::spawn(Arc::clone(&cache), config.sweep_interval);
        Self {
            store,
            tiers,
            cache,
            sweeper,
        }
    }

    /// Stop the background sweeper. Idempotent.
    pub fn stop(&self) {
        self.sweeper.stop();
    }

    /// Drop a cached lookup so the next resolution hits the store.
    pub fn invalidate(&self, cache_key: &str) {
        self.cache.invalidate(cache_key);
    }

    /// Resolve the customer an alert belongs to.
    pub async fn resolve(&self, alert: &Alert) -> Result<ResolvedCustomer, ResolveError> {
        if let Some(id) = alert.label("customer") {
            if let Some(customer) = self.lookup(&format!("id:{id}"), || self.store.get(id)).await {
                return Ok(resolved(customer, ResolutionMethod::CustomerLabel, id));
            }
        }

        if let Some(account) = alert.label("account_id") {
            if let Some(customer) = self
                .lookup(&format!("account:{account}"), || {
                    self.store.get_by_account_id(account)
                })
                .await
            {
                return Ok(resolved(customer, ResolutionMethod::AccountId, account));
            }
        }

        if let Some(domain) = alert.label("domain") {
            if let Some(customer) = self
                .lookup(&format!("domain:{domain}"), || {
                    self.store.get_by_domain(domain)
                })
                .await
            {
                return Ok(resolved(customer, ResolutionMethod::Domain, domain));
            }
        }

        if let Some(ip_label) = alert.label("client_ip") {
            // An unparsable client_ip label skips the attempt silently.
            if let Ok(addr) = ip_label.parse::<IpAddr>() {
                if let Some(customer) = self
                    .lookup(&format!("ip:{addr}"), || self.store.get_by_ip(addr))
                    .await
                {
                    return Ok(resolved(customer, ResolutionMethod::IpRange, ip_label));
                }
            }
        }

        Err(ResolveError::NoCustomerResolved)
    }

    /// Resolve the customer together with its tier configuration.
    ///
    /// A failed tier lookup still returns the customer, with the
    /// default tier knobs (multiplier 1.0, boost 0).
    pub async fn resolve_with_tier(
        &self,
        alert: &Alert,
    ) -> Result<(ResolvedCustomer, TierConfig), ResolveError> {
        let resolved = self.resolve(alert).await?;
        let tier = match self.tiers.get(&resolved.customer.tier_id).await {
            Ok(tier) => TierConfig::from(&tier),
            Err(e) => {
                warn!(
                    customer = %resolved.customer.id,
                    tier = %resolved.customer.tier_id,
                    error = %e,
                    "tier lookup failed, using default tier config"
                );
                TierConfig::default()
            }
        };
        Ok((resolved, tier))
    }

    /// Cached store lookup. Returns `None` for not-found and for
    /// unexpected errors (which are logged), letting the caller fall
    /// through to the next attempt.
    async fn lookup<F, Fut>(&self, cache_key: &str, fetch: F) -> Option<Customer>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Customer, siren_store::StoreError>>,
    {
        if let Some(hit) = self.cache.get(cache_key) {
            return Some(hit);
        }
        match fetch().await {
            Ok(customer) => {
                self.cache.insert(cache_key, customer.clone());
                Some(customer)
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                debug!(key = cache_key, error = %e, "customer lookup failed, trying next strategy");
                None
            }
        }
    }
}

fn resolved(
    customer: Customer,
    method: ResolutionMethod,
    matched_value: &str,
) -> ResolvedCustomer {
    ResolvedCustomer {
        customer,
        method,
        matched_value: matched_value.to_owned(),
    }
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use siren_core::{Alert, Carrier};
use siren_store::CarrierStore;

use crate::ResolutionMethod;
use crate::cache::{CacheSweeper, ResolverConfig, TtlCache};
use crate::error::ResolveError;

/// A carrier resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCarrier {
    pub carrier: Carrier,
    pub method: ResolutionMethod,
    pub matched_value: String,
}

/// Resolves carriers from the `asn` alert label by exact ASN lookup.
pub struct CarrierResolver {
    store: Arc<dyn CarrierStore>,
    cache: Arc<TtlCache<Carrier>>,
    sweeper: CacheSweeper,
}

impl CarrierResolver {
    /// Build a resolver and start its cache sweeper.
    #[must_use]
    pub fn new(store: Arc<dyn CarrierStore>, config: &ResolverConfig) -> Self {
        let cache = Arc::new(TtlCache::new(config.cache_ttl));
        let sweeper = CacheSweeper::spawn(Arc::clone(&cache), config.sweep_interval);
        Self {
            store,
            cache,
            sweeper,
        }
    }

    /// Stop the background sweeper. Idempotent.
    pub fn stop(&self) {
        self.sweeper.stop();
    }

    /// Drop a cached ASN so the next resolution hits the store.
    pub fn invalidate(&self, asn: u32) {
        self.cache.invalidate(&format!("asn:{asn}"));
    }

    /// Resolve the upstream carrier an alert concerns.
    pub async fn resolve(&self, alert: &Alert) -> Result<ResolvedCarrier, ResolveError> {
        let label = alert.label("asn").ok_or(ResolveError::NoCarrierResolved)?;
        // Accept both bare numbers and the `AS64512` spelling.
        let asn: u32 = label
            .trim_start_matches("AS")
            .trim_start_matches("as")
            .parse()
            .map_err(|_| ResolveError::NoCarrierResolved)?;

        let key = format!("asn:{asn}");
        if let Some(carrier) = self.cache.get(&key) {
            return Ok(ResolvedCarrier {
                carrier,
                method: ResolutionMethod::Asn,
                matched_value: label.to_owned(),
            });
        }

        match self.store.get_by_asn(asn).await {
            Ok(carrier) => {
                self.cache.insert(key, carrier.clone());
                Ok(ResolvedCarrier {
                    carrier,
                    method: ResolutionMethod::Asn,
                    matched_value: label.to_owned(),
                })
            }
            Err(e) => {
                if !e.is_not_found() {
                    debug!(asn, error = %e, "carrier lookup failed");
                }
                Err(ResolveError::NoCarrierResolved)
            }
        }
    }
}

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use siren_core::{Alert, EquipmentType, normalize_equipment_name};
use siren_store::EquipmentTypeStore;

use crate::ResolutionMethod;
use crate::cache::{CacheSweeper, ResolverConfig, TtlCache};
use crate::error::ResolveError;

/// An equipment resolution and how it was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedEquipment {
    pub equipment: EquipmentType,
    pub method: ResolutionMethod,
    pub matched_value: String,
}

/// Keyword patterns applied to the `job` label.
static JOB_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("router", "router"),
        ("switch", "switch"),
        ("firewall", "firewall"),
        ("server", "server"),
        ("load[-_ ]?balancer", "load_balancer"),
        ("storage", "storage"),
        ("pdu", "pdu"),
        ("ups", "ups"),
    ]
    .into_iter()
    .map(|(pattern, name)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("static pattern");
        (re, name)
    })
    .collect()
});

/// Hostname prefixes applied to the `instance` label.
static HOSTNAME_PREFIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("rtr", "router"),
        ("sw", "switch"),
        ("fw", "firewall"),
        ("srv", "server"),
        ("lb", "load_balancer"),
        ("stor", "storage"),
        ("pdu", "pdu"),
        ("ups", "ups"),
    ]
    .into_iter()
    .map(|(prefix, name)| {
        let re = Regex::new(&format!("(?i)^{prefix}[-_]")).expect("static pattern");
        (re, name)
    })
    .collect()
});

/// Resolves equipment types from alert labels.
///
/// Attempt order: `equipment_type` label, `device_type` label, `job`
/// keyword patterns, `instance` hostname prefixes. Every strategy
/// produces a normalised equipment name which is then looked up in the
/// store.
pub struct EquipmentResolver {
    store: Arc<dyn EquipmentTypeStore>,
    cache: Arc<TtlCache<EquipmentType>>,
    sweeper: CacheSweeper,
}

impl EquipmentResolver {
    /// Build a resolver and start its cache sweeper.
    #[must_use]
    pub fn new(store: Arc<dyn EquipmentTypeStore>, config: &ResolverConfig) -> Self {
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

    /// Drop a cached name so the next resolution hits the store.
    pub fn invalidate(&self, name: &str) {
        self.cache.invalidate(&normalize_equipment_name(name));
    }

    /// Resolve the equipment type an alert concerns.
    pub async fn resolve(&self, alert: &Alert) -> Result<ResolvedEquipment, ResolveError> {
        let attempts: [(ResolutionMethod, Option<(String, String)>); 4] = [
            (
                ResolutionMethod::EquipmentTypeLabel,
                alert
                    .label("equipment_type")
                    .map(|v| (normalize_equipment_name(v), v.to_owned())),
            ),
            (
                ResolutionMethod::DeviceTypeLabel,
                alert
                    .label("device_type")
                    .map(|v| (normalize_equipment_name(v), v.to_owned())),
            ),
            (
                ResolutionMethod::JobPattern,
                alert.label("job").and_then(|job| {
                    infer_from_job(job).map(|name| (name.to_owned(), job.to_owned()))
                }),
            ),
            (
                ResolutionMethod::HostnamePrefix,
                alert.label("instance").and_then(|instance| {
                    infer_from_hostname(instance)
                        .map(|name| (name.to_owned(), instance.to_owned()))
                }),
            ),
        ];

        for (method, candidate) in attempts {
            let Some((name, matched_value)) = candidate else {
                continue;
            };
            if let Some(equipment) = self.lookup(&name).await {
                return Ok(ResolvedEquipment {
                    equipment,
                    method,
                    matched_value,
                });
            }
        }

        Err(ResolveError::NoEquipmentResolved)
    }

    async fn lookup(&self, name: &str) -> Option<EquipmentType> {
        let key = name.to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }
        match self.store.get_by_name(name).await {
            Ok(equipment) => {
                self.cache.insert(key, equipment.clone());
                Some(equipment)
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                debug!(name, error = %e, "equipment lookup failed, trying next strategy");
                None
            }
        }
    }
}

/// Infer an equipment name from a scrape job name.
fn infer_from_job(job: &str) -> Option<&'static str> {
    JOB_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(job))
        .map(|(_, name)| *name)
}

/// Infer an equipment name from an instance hostname. A `:port` suffix
/// is stripped before matching.
fn infer_from_hostname(instance: &str) -> Option<&'static str> {
    let host = instance.split(':').next().unwrap_or(instance);
    HOSTNAME_PREFIXES
        .iter()
        .find(|(re, _)| re.is_match(host))
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::{AlertSource, EquipmentCategory, Severity};
    use siren_store_memory::InMemoryEquipmentTypeStore;

    async fn resolver_with(names: &[&str]) -> EquipmentResolver {
        let store = Arc::new(InMemoryEquipmentTypeStore::new());
        for name in names {
            store
                .create(EquipmentType::new(name, EquipmentCategory::Network))
                .await
                .unwrap();
        }
        EquipmentResolver::new(store, &ResolverConfig::default())
    }

    fn alert() -> Alert {
        Alert::new("fp", "x", AlertSource::Prometheus, Severity::Warning)
    }

    #[test]
    fn job_patterns() {
        assert_eq!(infer_from_job("snmp-Router-exporter"), Some("router"));
        assert_eq!(infer_from_job("load-balancer-metrics"), Some("load_balancer"));
        assert_eq!(infer_from_job("node"), None);
    }

    #[test]
    fn hostname_prefixes_strip_ports() {
        assert_eq!(infer_from_hostname("rtr-nyc-01:9100"), Some("router"));
        assert_eq!(infer_from_hostname("SW_core2"), Some("switch"));
        assert_eq!(infer_from_hostname("db-primary:5432"), None);
        // Prefix must be delimited; "swish-host" is not a switch.
        assert_eq!(infer_from_hostname("swish-host"), None);
    }

    #[tokio::test]
    async fn direct_label_is_normalised() {
        let resolver = resolver_with(&["load_balancer"]).await;
        let a = alert().with_label("equipment_type", "Load Balancer");
        let r = resolver.resolve(&a).await.unwrap();
        assert_eq!(r.equipment.name, "load_balancer");
        assert_eq!(r.method, ResolutionMethod::EquipmentTypeLabel);
    }

    #[tokio::test]
    async fn hostname_inference_is_last_resort() {
        let resolver = resolver_with(&["router"]).await;
        let a = alert().with_label("instance", "rtr-nyc-01:9100");
        let r = resolver.resolve(&a).await.unwrap();
        assert_eq!(r.equipment.name, "router");
        assert_eq!(r.method, ResolutionMethod::HostnamePrefix);
        assert_eq!(r.matched_value, "rtr-nyc-01:9100");
    }

    #[tokio::test]
    async fn device_type_beats_job() {
        let resolver = resolver_with(&["switch", "router"]).await;
        let a = alert()
            .with_label("device_type", "switch")
            .with_label("job", "router-exporter");
        let r = resolver.resolve(&a).await.unwrap();
        assert_eq!(r.equipment.name, "switch");
        assert_eq!(r.method, ResolutionMethod::DeviceTypeLabel);
    }

    #[tokio::test]
    async fn unknown_name_falls_through_to_next_attempt() {
        // The equipment_type label names something the store lacks; the
        // job pattern attempt still runs and hits.
        let resolver = resolver_with(&["router"]).await;
        let a = alert()
            .with_label("equipment_type", "chassis")
            .with_label("job", "router-exporter");
        let r = resolver.resolve(&a).await.unwrap();
        assert_eq!(r.method, ResolutionMethod::JobPattern);
    }

    #[tokio::test]
    async fn no_labels_resolve_nothing() {
        let resolver = resolver_with(&["router"]).await;
        assert!(matches!(
            resolver.resolve(&alert()).await.unwrap_err(),
            ResolveError::NoEquipmentResolved
        ));
    }
}

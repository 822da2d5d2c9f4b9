use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::trace;

/// Tuning knobs shared by every resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How long a cached lookup stays fresh.
    pub cache_ttl: Duration,
    /// How often the sweeper evicts expired entries.
    pub sweep_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

/// A TTL map in front of store lookups.
///
/// Read-heavy: gets take the read lock and copy the value out; inserts,
/// invalidations, and sweeps take the write lock. Entry count is
/// unbounded; expired entries are removed by the sweeper rather than
/// on insert.
pub struct TtlCache<T> {
    entries: RwLock<HashMap<String, Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Fetch a fresh entry. Expired entries read as misses; the sweeper
    /// removes them later.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    /// Insert a value with the configured TTL.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop a single key. Mutating callers use this so the next lookup
    /// hits the store.
    pub fn invalidate(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Remove every expired entry; returns how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Current entry count, expired entries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Background eviction task for a [`TtlCache`].
///
/// `stop` is idempotent; dropping the handle also stops the task.
pub struct CacheSweeper {
    stop: watch::Sender<bool>,
}

impl CacheSweeper {
    /// Spawn a sweeper over `cache` ticking every `interval`.
    #[must_use]
    pub fn spawn<T: Clone + Send + Sync + 'static>(
        cache: Arc<TtlCache<T>>,
        interval: Duration,
    ) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh cache
            // is not swept before anything is inserted.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = cache.purge_expired();
                        if evicted > 0 {
                            trace!(evicted, "resolver cache sweep");
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

    /// Signal the sweeper to exit. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_read_as_misses() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_millis(0));
        cache.insert("k", "v".to_owned());
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn fresh_entries_hit() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 7);
        assert_eq!(cache.get("k"), Some(7));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn invalidate_forces_store_lookup() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 7);
        cache.invalidate("k");
        assert!(cache.get("k").is_none());
    }

    #[tokio::test]
    async fn sweeper_stop_is_idempotent() {
        let cache: Arc<TtlCache<u32>> = Arc::new(TtlCache::new(Duration::from_secs(1)));
        let sweeper = CacheSweeper::spawn(cache, Duration::from_millis(10));
        sweeper.stop();
        sweeper.stop();
    }
}

//! TTL and size bounded in-memory cache
//!
//! A single read/write lock guards the map. Lookups take the shared lock and
//! update access metadata through atomics; writes, evictions and the sweep take
//! the exclusive lock. Expired entries are dropped lazily on lookup and by a
//! background sweep.

use crate::cache::traits::Cache;
use crate::cache::{CacheStats, EstimateSize};
use crate::context::wait_stopped;
use async_trait::async_trait;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Configuration for [`TtlCache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlCacheConfig {
    /// TTL applied when `set` is given a zero TTL; zero disables expiry
    pub default_ttl: Duration,
    /// Maximum number of entries, `None` for unbounded
    pub size_limit: Option<usize>,
    /// Interval of the expiry sweep; zero disables the sweep
    pub sweep_interval: Duration,
}

impl Default for TtlCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(10),
            size_limit: Some(1000),
            sweep_interval: Duration::from_millis(2500),
        }
    }
}

/// Stored value with expiry and access metadata
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    /// `None` never expires
    pub expires_at: Option<Instant>,
    pub size_estimate: u64,
    /// Nanoseconds since the owning cache was created
    last_accessed: AtomicU64,
    access_count: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, expires_at: Option<Instant>, size_estimate: u64, now: u64) -> Self {
        Self {
            value,
            expires_at,
            size_estimate,
            last_accessed: AtomicU64::new(now),
            access_count: AtomicU64::new(0),
        }
    }

    /// Expired strictly after `expires_at`
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    fn last_accessed(&self) -> u64 {
        self.last_accessed.load(Ordering::Relaxed)
    }

    fn touch(&self, now: u64) {
        self.last_accessed.fetch_max(now, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }
}

struct Inner<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    config: TtlCacheConfig,
    epoch: Instant,
}

impl<V> Inner<V> {
    fn offset(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    /// Remove every expired entry, returning how many were removed
    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Evict least recently accessed entries until one more fits
    fn make_room(&self, entries: &mut HashMap<String, CacheEntry<V>>) {
        let Some(limit) = self.config.size_limit.filter(|limit| *limit > 0) else {
            return;
        };

        while entries.len() >= limit {
            let Some(victim) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed())
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            entries.remove(&victim);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!("Evicted least recently used key '{victim}'");
        }
    }
}

/// Generic string-keyed TTL cache with LRU eviction
///
/// Constructing the cache inside a tokio runtime starts the expiry sweep. The
/// sweep ends on [`stop`](Self::stop) or when the cache is dropped.
pub struct TtlCache<V> {
    inner: Arc<Inner<V>>,
    shutdown: watch::Sender<bool>,
    sweeper: Option<JoinHandle<()>>,
}

impl<V> TtlCache<V>
where
    V: Clone + EstimateSize + Send + Sync + 'static,
{
    /// Create a cache with default configuration
    pub fn new() -> Self {
        Self::with_config(TtlCacheConfig::default())
    }

    /// Create a cache with custom configuration
    pub fn with_config(config: TtlCacheConfig) -> Self {
        let sweep_interval = config.sweep_interval;
        let inner = Arc::new(Inner {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            config,
            epoch: Instant::now(),
        });
        let (shutdown, _) = watch::channel(false);

        let sweeper = if sweep_interval.is_zero() {
            None
        } else {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => Some(runtime.spawn(run_sweeper(
                    inner.clone(),
                    sweep_interval,
                    shutdown.subscribe(),
                ))),
                Err(_) => {
                    debug!("No tokio runtime, cache sweep disabled");
                    None
                }
            }
        };

        Self {
            inner,
            shutdown,
            sweeper,
        }
    }

    pub fn config(&self) -> &TtlCacheConfig {
        &self.inner.config
    }

    /// Look up a live entry
    ///
    /// An expired entry counts as a miss and is removed.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.inner.entries.read().await;
            match entries.get(key) {
                None => {
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some(entry) if !entry.is_expired(now) => {
                    entry.touch(self.inner.offset(now));
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.inner.entries.write().await;
        // A concurrent set may have replaced the expired entry meanwhile
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            self.inner.evictions.fetch_add(1, Ordering::Relaxed);
        }
        None
    }

    /// Store with the default TTL
    pub async fn insert(&self, key: &str, value: V) {
        self.set(key, value, Duration::ZERO).await;
    }

    /// Store or overwrite an entry
    ///
    /// Inserting a new key into a full cache evicts least recently accessed
    /// entries until it fits. Overwrites never evict.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = Instant::now();
        let ttl = if ttl.is_zero() {
            self.inner.config.default_ttl
        } else {
            ttl
        };
        let expires_at = (!ttl.is_zero()).then(|| now + ttl);
        let size_estimate = value.estimate_size() + key.len() as u64;
        let entry = CacheEntry::new(value, expires_at, size_estimate, self.inner.offset(now));

        let mut entries = self.inner.entries.write().await;
        if !entries.contains_key(key) {
            self.inner.make_room(&mut entries);
        }
        entries.insert(key.to_string(), entry);
    }

    /// Remove an entry; counted as an eviction when it existed
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self.inner.entries.write().await.remove(key).is_some();
        if removed {
            self.inner.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove every entry
    pub async fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.inner.entries.write().await;
            let removed = entries.len();
            entries.clear();
            removed
        };
        self.inner
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Run the expiry sweep now
    pub async fn purge_expired(&self) -> usize {
        self.inner.purge_expired().await
    }

    /// Number of stored entries, expired or not
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Access count of an entry, without touching it
    pub async fn access_count(&self, key: &str) -> Option<u64> {
        self.inner
            .entries
            .read()
            .await
            .get(key)
            .map(CacheEntry::access_count)
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.inner.entries.read().await;
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            size: entries.len(),
            total_size_bytes: entries.values().map(|entry| entry.size_estimate).sum(),
        }
    }

    /// Signal the expiry sweep to stop; idempotent
    ///
    /// The sweep task exits at its next scheduling point.
    pub fn stop(&self) {
        let was_stopped = self.shutdown.send_replace(true);
        if !was_stopped {
            debug!("Cache sweep stopping");
        }
    }

    /// Whether the expiry sweep task is still alive
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + EstimateSize + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

async fn run_sweeper<V>(inner: Arc<Inner<V>>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = wait_stopped(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let removed = inner.purge_expired().await;
        if removed > 0 {
            trace!("Cache sweep removed {removed} expired entries");
        }
    }
}

#[async_trait]
impl<V> Cache<V> for TtlCache<V>
where
    V: Clone + EstimateSize + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        TtlCache::get(self, key).await
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) {
        TtlCache::set(self, key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> bool {
        TtlCache::delete(self, key).await
    }

    async fn clear(&self) -> usize {
        TtlCache::clear(self).await
    }

    async fn stats(&self) -> CacheStats {
        TtlCache::stats(self).await
    }

    fn stop(&self) {
        TtlCache::stop(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn config(ttl_ms: u64, size_limit: Option<usize>) -> TtlCacheConfig {
        TtlCacheConfig {
            default_ttl: Duration::from_millis(ttl_ms),
            size_limit,
            sweep_interval: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_then_miss_after_ttl() {
        let cache = TtlCache::with_config(config(1_000, None));
        cache.set("k", "v".to_string(), Duration::from_millis(50)).await;

        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        advance(Duration::from_millis(60)).await;
        assert_eq!(cache.get("k").await, None);

        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.evictions), (1, 1, 1));
        assert_eq!(stats.size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_strict() {
        let cache = TtlCache::with_config(config(1_000, None));
        cache.set("k", 1u64, Duration::from_millis(50)).await;

        advance(Duration::from_millis(50)).await;
        assert_eq!(cache.get("k").await, Some(1));
        advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_uses_default() {
        let cache = TtlCache::with_config(config(100, None));
        cache.insert("k", 1u64).await;

        advance(Duration::from_millis(90)).await;
        assert_eq!(cache.get("k").await, Some(1));
        advance(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_default_ttl_never_expires() {
        let cache = TtlCache::with_config(config(0, None));
        cache.insert("k", 1u64).await;

        advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.get("k").await, Some(1));
        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_least_recently_accessed() {
        let cache = TtlCache::with_config(config(60_000, Some(2)));
        cache.insert("a", 1u64).await;
        advance(Duration::from_millis(1)).await;
        cache.insert("b", 2u64).await;
        advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("a").await, Some(1));
        advance(Duration::from_millis(1)).await;

        cache.insert("c", 3u64).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get("c").await, Some(3));
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = TtlCache::with_config(config(60_000, Some(2)));
        cache.insert("a", 1u64).await;
        cache.insert("b", 2u64).await;
        cache.insert("a", 10u64).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await, Some(10));
        assert_eq!(cache.get("b").await, Some(2));
        assert_eq!(cache.stats().await.evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_never_exceeds_limit() {
        let cache = TtlCache::with_config(config(60_000, Some(3)));
        for i in 0..10u64 {
            cache.insert(&format!("key-{i}"), i).await;
            assert!(cache.len().await <= 3);
        }
        assert_eq!(cache.stats().await.evictions, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_updates_access_metadata() {
        let cache = TtlCache::with_config(config(60_000, None));
        cache.insert("k", 1u64).await;
        assert_eq!(cache.access_count("k").await, Some(0));

        cache.get("k").await;
        cache.get("k").await;
        assert_eq!(cache.access_count("k").await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_and_clear() {
        let cache = TtlCache::with_config(config(60_000, None));
        cache.insert("a", 1u64).await;
        cache.insert("b", 2u64).await;
        cache.insert("c", 3u64).await;

        assert!(cache.delete("a").await);
        assert!(!cache.delete("a").await);
        assert_eq!(cache.clear().await, 2);

        let stats = cache.stats().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.evictions, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_entries() {
        let cache = TtlCache::with_config(TtlCacheConfig {
            default_ttl: Duration::from_millis(100),
            size_limit: None,
            sweep_interval: Duration::from_millis(25),
        });
        cache.insert("a", 1u64).await;
        cache.set("b", 2u64, Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(160)).await;

        assert_eq!(cache.len().await, 1);
        let stats = cache.stats().await;
        assert_eq!(stats.evictions, 1);
        // the sweep never touches hit/miss counters
        assert_eq!((stats.hits, stats.misses), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_sweep() {
        let cache: TtlCache<u64> = TtlCache::with_config(TtlCacheConfig {
            sweep_interval: Duration::from_millis(10),
            ..config(100, None)
        });
        assert!(cache.is_sweeping());

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(cache.is_sweeping());

        cache.stop();
        cache.stop();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!cache.is_sweeping());

        cache.insert("k", 1u64).await;
        assert_eq!(cache.get("k").await, Some(1));
    }

    #[tokio::test]
    async fn test_total_size_bytes_tracks_entries() {
        let cache = TtlCache::with_config(config(60_000, None));
        cache.insert("k", "x".repeat(64)).await;
        let with_entry = cache.stats().await.total_size_bytes;
        assert!(with_entry >= 65);

        cache.delete("k").await;
        assert_eq!(cache.stats().await.total_size_bytes, 0);
    }
}

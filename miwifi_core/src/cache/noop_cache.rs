//! Cache that stores nothing, used when caching is disabled

use crate::cache::CacheStats;
use crate::cache::traits::Cache;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Every lookup is a miss and every write is discarded
#[derive(Debug, Default)]
pub struct NoOpCache {
    misses: AtomicU64,
}

impl NoOpCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<V: Send + 'static> Cache<V> for NoOpCache {
    async fn get(&self, _key: &str) -> Option<V> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn set(&self, _key: &str, _value: V, _ttl: Duration) {}

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn clear(&self) -> usize {
        0
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        }
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_never_hits() {
        let cache = NoOpCache::new();
        Cache::<u64>::set(&cache, "wan_info", 1, Duration::ZERO).await;

        assert_eq!(Cache::<u64>::get(&cache, "wan_info").await, None);
        let stats = Cache::<u64>::stats(&cache).await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0);
    }
}

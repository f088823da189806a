//! Cache trait definitions

use crate::cache::CacheStats;
use async_trait::async_trait;
use std::time::Duration;

/// String-keyed value cache
///
/// Every operation is infallible; a missing or expired entry is simply `None`.
#[async_trait]
pub trait Cache<V>: Send + Sync {
    /// Look up a live entry, refreshing its access metadata on a hit
    async fn get(&self, key: &str) -> Option<V>;

    /// Store or overwrite an entry; a zero `ttl` means the cache's default TTL
    async fn set(&self, key: &str, value: V, ttl: Duration);

    /// Remove an entry, returning whether it existed
    async fn delete(&self, key: &str) -> bool;

    /// Remove every entry, returning how many were removed
    async fn clear(&self) -> usize;

    /// Counters and current size
    async fn stats(&self) -> CacheStats;

    /// Stop background maintenance; stored entries stay readable
    fn stop(&self);
}

//! In-memory caching for router artifacts
//!
//! [`ttl_cache::TtlCache`] is a generic string-keyed store with per-entry
//! expiry, LRU eviction and a periodic sweep. [`router_cache::RouterCache`]
//! layers the four router artifacts and a background refresher on top of it.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;

pub mod noop_cache;
pub mod refresher;
pub mod router_cache;
pub mod traits;
pub mod ttl_cache;

pub use noop_cache::NoOpCache;
pub use router_cache::{CacheState, Lookup, RouterCache, RouterCacheConfig, RouterStore, SnapshotSource};
pub use traits::Cache;
pub use ttl_cache::{CacheEntry, TtlCache, TtlCacheConfig};

/// Cache statistics
///
/// Serializes with the derived `hit_rate` alongside the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Capacity evictions, expirations and explicit removals
    pub evictions: u64,
    /// Entries currently stored
    pub size: usize,
    /// Sum of per-entry size estimates
    pub total_size_bytes: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or 0 without traffic
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl Serialize for CacheStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CacheStats", 6)?;
        state.serialize_field("hits", &self.hits)?;
        state.serialize_field("misses", &self.misses)?;
        state.serialize_field("evictions", &self.evictions)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("total_size_bytes", &self.total_size_bytes)?;
        state.serialize_field("hit_rate", &self.hit_rate())?;
        state.end()
    }
}

/// Approximate in-memory footprint of a cached value
pub trait EstimateSize {
    fn estimate_size(&self) -> u64;
}

impl EstimateSize for String {
    fn estimate_size(&self) -> u64 {
        (std::mem::size_of::<String>() + self.len()) as u64
    }
}

impl EstimateSize for Vec<u8> {
    fn estimate_size(&self) -> u64 {
        (std::mem::size_of::<Vec<u8>>() + self.len()) as u64
    }
}

macro_rules! fixed_size {
    ($($ty:ty),*) => {
        $(impl EstimateSize for $ty {
            fn estimate_size(&self) -> u64 {
                std::mem::size_of::<$ty>() as u64
            }
        })*
    };
}

fixed_size!(u32, u64, i64, usize, bool);

impl<T: EstimateSize + ?Sized> EstimateSize for Arc<T> {
    fn estimate_size(&self) -> u64 {
        (**self).estimate_size()
    }
}

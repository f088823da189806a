//! MiWiFi Core Library
//!
//! Bounded-concurrency fetching and TTL caching of router data: a worker pool,
//! a four-way data fetcher with retries and a round timeout, a generic TTL/LRU
//! cache, and a typed router cache with a background refresher.

pub mod cache;
pub mod client;
pub mod concurrent;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod models;
pub mod snapshot;

// Re-export main types
pub use cache::{
    CacheStats, CacheState, EstimateSize, Lookup, RouterCache, RouterCacheConfig, RouterStore,
    SnapshotSource, TtlCache, TtlCacheConfig,
};
pub use client::{DataLoader, RouterClient};
pub use concurrent::{DataFetcher, FetchReport, FetcherConfig, Task, TaskResult, WorkerPool};
pub use config::{CacheSettings, CoreConfig, FetcherSettings};
pub use context::{CancelHandle, FetchContext};
pub use error::{Error, FetchError, PartialFetch, RemoteError, Result, ValidationError};
pub use logging::{LogReporter, NullReporter, Reporter};
pub use snapshot::{RouterArtifact, RouterDataSnapshot, RouterField};

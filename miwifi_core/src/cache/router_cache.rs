//! Typed cache for the four router artifacts
//!
//! [`RouterStore`] maps each [`RouterField`] onto a fixed key of a generic
//! [`Cache`], all with one shared TTL. [`RouterCache`] adds the loader
//! lifecycle (uninitialized, idle, stopped), the background refresher and the
//! read-through path used by collectors.

use crate::cache::noop_cache::NoOpCache;
use crate::cache::refresher::Refresher;
use crate::cache::traits::Cache;
use crate::cache::ttl_cache::{TtlCache, TtlCacheConfig};
use crate::cache::{CacheStats, EstimateSize};
use crate::client::{DataLoader, RouterClient, fetch_field};
use crate::concurrent::fetcher::DataFetcher;
use crate::context::FetchContext;
use crate::error::{PartialFetch, Result, ValidationError};
use crate::logging::{LogReporter, Reporter};
use crate::models::{DeviceList, SystemStatus, WanInfo, WifiDetailAll};
use crate::snapshot::{RouterArtifact, RouterDataSnapshot, RouterField};
use log::debug;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

impl EstimateSize for RouterArtifact {
    fn estimate_size(&self) -> u64 {
        let encoded = match self {
            RouterArtifact::SystemStatus(v) => serde_json::to_vec(v.as_ref()),
            RouterArtifact::DeviceList(v) => serde_json::to_vec(v.as_ref()),
            RouterArtifact::WanInfo(v) => serde_json::to_vec(v.as_ref()),
            RouterArtifact::WifiDetails(v) => serde_json::to_vec(v.as_ref()),
        };
        encoded.map(|bytes| bytes.len() as u64).unwrap_or(0)
    }
}

/// Router cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterCacheConfig {
    /// When false every lookup misses and writes are discarded
    pub enabled: bool,
    pub cache: TtlCacheConfig,
    /// Start the refresher as soon as a loader is installed
    pub preload: bool,
    /// Bound on one background refresh round
    pub refresh_timeout: Duration,
}

impl Default for RouterCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache: TtlCacheConfig::default(),
            preload: true,
            refresh_timeout: Duration::from_secs(30),
        }
    }
}

/// Typed view of the four router keys
#[derive(Clone)]
pub struct RouterStore {
    cache: Arc<dyn Cache<RouterArtifact>>,
    ttl: Duration,
}

macro_rules! typed_accessors {
    ($($get:ident, $set:ident, $variant:ident, $ty:ty;)*) => {
        $(
            pub async fn $get(&self) -> Option<Arc<$ty>> {
                match self.get(RouterField::$variant).await? {
                    RouterArtifact::$variant(value) => Some(value),
                    _ => None,
                }
            }

            pub async fn $set(&self, value: Arc<$ty>) {
                self.set(RouterArtifact::$variant(value)).await
            }
        )*
    };
}

impl RouterStore {
    pub fn new(cache: Arc<dyn Cache<RouterArtifact>>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Shared TTL applied to every artifact
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    typed_accessors! {
        get_system_status, set_system_status, SystemStatus, SystemStatus;
        get_device_list, set_device_list, DeviceList, DeviceList;
        get_wan_info, set_wan_info, WanInfo, WanInfo;
        get_wifi_details, set_wifi_details, WifiDetails, WifiDetailAll;
    }

    /// Read one field
    pub async fn get(&self, field: RouterField) -> Option<RouterArtifact> {
        self.cache
            .get(field.cache_key())
            .await
            .filter(|artifact| artifact.field() == field)
    }

    /// Write one artifact under its field's key
    pub async fn set(&self, artifact: RouterArtifact) {
        let key = artifact.field().cache_key();
        self.cache.set(key, artifact, self.ttl).await;
    }

    /// Read all four fields; missing ones stay empty
    pub async fn snapshot(&self) -> RouterDataSnapshot {
        let mut snapshot = RouterDataSnapshot::new();
        for field in RouterField::ALL {
            if let Some(artifact) = self.get(field).await {
                snapshot.insert(artifact);
            }
        }
        snapshot
    }

    /// Write every populated field of `snapshot`
    pub async fn store(&self, snapshot: &RouterDataSnapshot) {
        for artifact in snapshot.artifacts() {
            self.set(artifact).await;
        }
    }

    /// One concurrent round of the four loader calls
    ///
    /// Each successful call is written to the cache as soon as it returns,
    /// independently of the others. Returns the first reported error once
    /// all four calls have finished.
    pub async fn preload_data(&self, ctx: &FetchContext, loader: Arc<DataLoader>) -> Result<()> {
        let (error_tx, mut error_rx) = mpsc::channel(RouterField::ALL.len());
        let mut calls = JoinSet::new();

        for field in RouterField::ALL {
            let store = self.clone();
            let loader = loader.clone();
            let ctx = ctx.clone();
            let error_tx = error_tx.clone();

            calls.spawn(async move {
                match ctx.run(fetch_field(&loader, &ctx, field)).await {
                    Ok(artifact) => store.set(artifact).await,
                    Err(e) => {
                        // One slot per field, so this never fails
                        let _ = error_tx.try_send(e);
                    }
                }
            });
        }
        drop(error_tx);

        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                debug!("Preload call ended abnormally: {e}");
            }
        }

        match error_rx.recv().await {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub async fn clear(&self) -> usize {
        self.cache.clear().await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    fn stop(&self) {
        self.cache.stop();
    }
}

/// Lifecycle of the loader attached to a [`RouterCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No loader installed yet
    Uninitialized,
    /// Loader installed; refreshing on schedule when preload is enabled
    Idle,
    /// Terminal; the cache stays usable but is never refreshed again
    Stopped,
}

enum LoaderState {
    Uninitialized,
    Idle(Option<Refresher>),
    Stopped,
}

/// Where a snapshot handed out by [`RouterCache::get_or_fetch`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Cache,
    Fetch,
}

/// A complete snapshot and its source
#[derive(Debug, Clone)]
pub struct Lookup {
    pub snapshot: RouterDataSnapshot,
    pub source: SnapshotSource,
}

/// Router artifact cache with an optional background refresher
pub struct RouterCache {
    store: RouterStore,
    config: RouterCacheConfig,
    reporter: Arc<dyn Reporter>,
    loader: StdMutex<LoaderState>,
}

impl RouterCache {
    /// Create a cache reporting through the `log` facade
    pub fn new(config: RouterCacheConfig) -> Self {
        Self::with_reporter(config, LogReporter::shared())
    }

    /// Create a cache with an explicit reporter
    pub fn with_reporter(config: RouterCacheConfig, reporter: Arc<dyn Reporter>) -> Self {
        let cache: Arc<dyn Cache<RouterArtifact>> = if config.enabled {
            Arc::new(TtlCache::with_config(config.cache.clone()))
        } else {
            debug!("Router cache disabled");
            Arc::new(NoOpCache::new())
        };
        let store = RouterStore::new(cache, config.cache.default_ttl);

        Self {
            store,
            config,
            reporter,
            loader: StdMutex::new(LoaderState::Uninitialized),
        }
    }

    pub fn config(&self) -> &RouterCacheConfig {
        &self.config
    }

    /// Typed per-field access
    pub fn store(&self) -> &RouterStore {
        &self.store
    }

    pub fn state(&self) -> CacheState {
        match *self.lock_loader() {
            LoaderState::Uninitialized => CacheState::Uninitialized,
            LoaderState::Idle(_) => CacheState::Idle,
            LoaderState::Stopped => CacheState::Stopped,
        }
    }

    /// Whether a background refresher is currently scheduled
    pub fn is_refreshing(&self) -> bool {
        matches!(
            &*self.lock_loader(),
            LoaderState::Idle(Some(refresher)) if refresher.is_running()
        )
    }

    /// Install a loader, replacing any previous one
    ///
    /// With preload enabled a refresher starts right away and runs every
    /// `interval`, which needs a tokio runtime. Fails once the cache has been
    /// stopped.
    pub fn set_data_loader(&self, loader: Arc<DataLoader>, interval: Duration) -> Result<()> {
        let mut state = self.lock_loader();
        if matches!(*state, LoaderState::Stopped) {
            return Err(ValidationError::invalid_state("set_data_loader", "stopped").into());
        }
        if self.config.preload && interval.is_zero() {
            return Err(ValidationError::invalid_parameter(
                "interval",
                "refresh interval must be greater than zero",
            )
            .into());
        }

        let runtime = if self.config.preload {
            let runtime = Handle::try_current().map_err(|_| {
                ValidationError::invalid_state("set_data_loader", "no tokio runtime")
            })?;
            Some(runtime)
        } else {
            None
        };

        if let LoaderState::Idle(Some(previous)) = &*state {
            previous.cancel();
        }

        let refresher = runtime.map(|runtime| {
            Refresher::spawn(
                &runtime,
                self.store.clone(),
                loader,
                interval,
                self.config.refresh_timeout,
                self.reporter.clone(),
            )
        });
        *state = LoaderState::Idle(refresher);
        Ok(())
    }

    /// Run one loader round now, writing every field that succeeds
    pub async fn preload_data(&self, ctx: &FetchContext, loader: Arc<DataLoader>) -> Result<()> {
        self.store.preload_data(ctx, loader).await
    }

    /// Coherent full read; `None` unless all four fields are cached
    pub async fn get_snapshot(&self) -> Option<RouterDataSnapshot> {
        let snapshot = self.store.snapshot().await;
        snapshot.is_complete().then_some(snapshot)
    }

    /// Cache every populated field of `snapshot`
    pub async fn store_snapshot(&self, snapshot: &RouterDataSnapshot) {
        self.store.store(snapshot).await
    }

    /// Serve from cache when complete, otherwise fetch on demand
    ///
    /// Fields that arrive are cached even when the fetch fails as a whole.
    pub async fn get_or_fetch(
        &self,
        ctx: &FetchContext,
        fetcher: &DataFetcher,
        client: Arc<dyn RouterClient>,
    ) -> std::result::Result<Lookup, PartialFetch> {
        if let Some(snapshot) = self.get_snapshot().await {
            return Ok(Lookup {
                snapshot,
                source: SnapshotSource::Cache,
            });
        }

        match fetcher.fetch_data(ctx, client).await {
            Ok(snapshot) => {
                self.store_snapshot(&snapshot).await;
                Ok(Lookup {
                    snapshot,
                    source: SnapshotSource::Fetch,
                })
            }
            Err(partial) => {
                self.store_snapshot(&partial.snapshot).await;
                Err(partial)
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.stats().await
    }

    /// Drop every cached artifact
    pub async fn clear(&self) -> usize {
        self.store.clear().await
    }

    /// Stop the refresher, then the cache sweep
    ///
    /// Safe to call without a loader and more than once.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock_loader(), LoaderState::Stopped);
        if let LoaderState::Idle(Some(refresher)) = previous {
            refresher.shutdown().await;
        }
        self.store.stop();
    }

    fn lock_loader(&self) -> MutexGuard<'_, LoaderState> {
        self.loader
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RouterCache {
    fn drop(&mut self) {
        if let LoaderState::Idle(Some(refresher)) = &*self.lock_loader() {
            refresher.cancel();
        }
    }
}

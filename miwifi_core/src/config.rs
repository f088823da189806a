//! Serializable settings for the cache and the fetcher
//!
//! These are the on-disk / environment representation. Runtime components take
//! the `*Config` types with real [`Duration`]s, built via the conversion
//! helpers below.

use crate::cache::router_cache::RouterCacheConfig;
use crate::cache::ttl_cache::TtlCacheConfig;
use crate::concurrent::fetcher::FetcherConfig;
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level core settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub cache: CacheSettings,
    pub fetcher: FetcherSettings,
}

impl CoreConfig {
    /// Check all sections
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.fetcher.validate()
    }
}

/// Cache section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Serve reads from the cache at all
    pub enabled: bool,
    /// Entry time-to-live
    pub ttl_secs: u64,
    /// Maximum number of live entries
    pub size_limit: usize,
    /// Start the background refresher as soon as a loader is installed
    pub preload: bool,
    /// Refresh period, defaults to half the TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,
    /// Expired-entry sweep period, defaults to a quarter of the TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval_secs: Option<u64>,
    /// Upper bound for one background refresh round
    pub refresh_timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 10,
            size_limit: 1000,
            preload: true,
            refresh_interval_secs: None,
            sweep_interval_secs: None,
            refresh_timeout_secs: 30,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.ttl() / 2)
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.ttl() / 4)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    /// Settings for the generic TTL cache
    pub fn ttl_cache_config(&self) -> TtlCacheConfig {
        TtlCacheConfig {
            default_ttl: self.ttl(),
            size_limit: Some(self.size_limit).filter(|limit| *limit > 0),
            sweep_interval: self.sweep_interval(),
        }
    }

    /// Settings for the typed router cache
    pub fn router_cache_config(&self) -> RouterCacheConfig {
        RouterCacheConfig {
            enabled: self.enabled,
            cache: self.ttl_cache_config(),
            preload: self.preload,
            refresh_timeout: self.refresh_timeout(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(ValidationError::invalid_parameter(
                "cache.ttl_secs",
                "must be greater than zero",
            )
            .into());
        }
        if self.refresh_interval().is_zero() {
            return Err(ValidationError::invalid_parameter(
                "cache.refresh_interval_secs",
                "must be greater than zero",
            )
            .into());
        }
        if self.sweep_interval().is_zero() {
            return Err(ValidationError::invalid_parameter(
                "cache.sweep_interval_secs",
                "must be greater than zero",
            )
            .into());
        }
        if self.refresh_timeout_secs == 0 {
            return Err(ValidationError::invalid_parameter(
                "cache.refresh_timeout_secs",
                "must be greater than zero",
            )
            .into());
        }
        Ok(())
    }
}

/// Fetcher section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherSettings {
    /// Deadline for one fetch round
    pub timeout_secs: u64,
    /// Attempts per operation, including the first
    pub max_retries: u32,
    /// Fixed pause between attempts
    pub retry_delay_ms: u64,
    /// Worker pool width cap
    pub max_workers: usize,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 5000,
            max_workers: 4,
        }
    }
}

impl FetcherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Runtime fetcher configuration
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: self.timeout(),
            max_retries: self.max_retries,
            retry_delay: self.retry_delay(),
            max_workers: self.max_workers,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::invalid_parameter(
                "fetcher.timeout_secs",
                "must be greater than zero",
            )
            .into());
        }
        if self.max_retries == 0 {
            return Err(ValidationError::invalid_parameter(
                "fetcher.max_retries",
                "at least one attempt is required",
            )
            .into());
        }
        if self.max_workers == 0 {
            return Err(ValidationError::invalid_parameter(
                "fetcher.max_workers",
                "at least one worker is required",
            )
            .into());
        }
        Ok(())
    }
}

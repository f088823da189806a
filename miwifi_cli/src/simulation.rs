//! In-process simulated router and the `simulate` driver
//!
//! The simulated router answers the four read endpoints with fixed JSON
//! payloads after a configurable latency and fails a configurable share of
//! calls. `run_simulation` pushes a number of collection rounds through a
//! [`RouterCache`] and records where each snapshot came from.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use miwifi_core::context::FetchContext;
use miwifi_core::error::RemoteError;
use miwifi_core::models::{DeviceList, SystemStatus, WanInfo, WifiDetailAll};
use miwifi_core::{
    CacheStats, DataFetcher, RouterCache, RouterClient, RouterField, SnapshotSource,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Router stand-in with fixed latency and a deterministic failure rate
///
/// Call `n` (zero based, counted across all endpoints) fails when
/// `floor((n + 1) * rate)` exceeds `floor(n * rate)`, so exactly
/// `floor(N * rate)` of the first `N` calls fail.
pub struct SimulatedRouter {
    latency: Duration,
    failure_rate: f64,
    calls: AtomicU64,
}

impl SimulatedRouter {
    pub fn new(latency: Duration, failure_rate: f64) -> Self {
        Self {
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            calls: AtomicU64::new(0),
        }
    }

    /// Calls served so far, failed ones included
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn should_fail(&self, call: u64) -> bool {
        let before = (call as f64 * self.failure_rate).floor();
        let after = ((call + 1) as f64 * self.failure_rate).floor();
        after > before
    }

    async fn respond<T: DeserializeOwned>(
        &self,
        ctx: &FetchContext,
        field: RouterField,
        payload: fn() -> Value,
    ) -> miwifi_core::Result<T> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let operation = field.operation();

        if !self.latency.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.latency) => {}
                _ = ctx.cancelled() => return Err(ctx.cancellation_error().into()),
            }
        }

        if self.should_fail(call) {
            debug!("Simulated failure for {operation} (call {call})");
            return Err(RemoteError::network(operation, "simulated router failure").into());
        }

        serde_json::from_value(payload())
            .map_err(|e| RemoteError::decode(operation, e.to_string()).into())
    }
}

#[async_trait]
impl RouterClient for SimulatedRouter {
    async fn get_system_status(&self, ctx: &FetchContext) -> miwifi_core::Result<SystemStatus> {
        self.respond(ctx, RouterField::SystemStatus, system_status_payload)
            .await
    }

    async fn get_device_list(&self, ctx: &FetchContext) -> miwifi_core::Result<DeviceList> {
        self.respond(ctx, RouterField::DeviceList, device_list_payload)
            .await
    }

    async fn get_wan_info(&self, ctx: &FetchContext) -> miwifi_core::Result<WanInfo> {
        self.respond(ctx, RouterField::WanInfo, wan_info_payload)
            .await
    }

    async fn get_wifi_details(&self, ctx: &FetchContext) -> miwifi_core::Result<WifiDetailAll> {
        self.respond(ctx, RouterField::WifiDetails, wifi_details_payload)
            .await
    }
}

fn system_status_payload() -> Value {
    json!({
        "code": 0,
        "dev": [{
            "mac": "AA:BB:CC:DD:EE:FF",
            "devname": "Device1",
            "upload": "1048576",
            "download": "2097152",
            "upspeed": "1024",
            "downspeed": "2048",
            "maxuploadspeed": "10240",
            "maxdownloadspeed": "20480",
            "online": "1"
        }],
        "mem": { "usage": 0.65, "total": "256MB", "hz": "800MHz", "type": "DDR3" },
        "temperature": 45,
        "count": { "all": 5, "online": 3, "all_without_mash": 5, "online_without_mash": 3 },
        "hardware": {
            "mac": "00:11:22:33:44:55",
            "platform": "R3P",
            "version": "2.28.62",
            "channel": "release",
            "sn": "12345/67890"
        },
        "upTime": "86400",
        "cpu": { "core": 4, "hz": "800MHz", "load": 25.5 },
        "wan": {
            "downspeed": "2048",
            "maxdownloadspeed": "20480",
            "history": "",
            "devname": "eth0",
            "upload": "1073741824",
            "upspeed": "1024",
            "maxuploadspeed": "10240",
            "download": "2147483648"
        }
    })
}

fn device_list_payload() -> Value {
    json!({
        "code": 0,
        "mac": "00:11:22:33:44:55",
        "list": [{
            "mac": "AA:BB:CC:DD:EE:FF",
            "oname": "Device1",
            "isap": 0,
            "parent": "",
            "authority": { "wan": 1, "pridisk": 0, "admin": 1, "lan": 1 },
            "push": 0,
            "online": 1,
            "name": "Device1",
            "times": 0,
            "ip": [{
                "downspeed": "2048",
                "online": "1",
                "active": 1,
                "upspeed": "1024",
                "ip": "192.168.31.100"
            }],
            "statistics": { "downspeed": "2048", "online": "3600", "upspeed": "1024" },
            "icon": "",
            "type": 1
        }]
    })
}

fn wan_info_payload() -> Value {
    json!({
        "code": 0,
        "info": {
            "mac": "00:11:22:33:44:55",
            "mtu": "1500",
            "details": {
                "username": "",
                "ifname": "eth0",
                "wanType": "dhcp",
                "service": "",
                "password": "",
                "peerdns": "1"
            },
            "gateWay": "192.168.1.1",
            "dnsAddrs1": "8.8.4.4",
            "status": 1,
            "uptime": 86400,
            "dnsAddrs": "8.8.8.8",
            "ipv6_show": 0,
            "link": 1,
            "ipv4": [{ "mask": "255.255.255.0", "ip": "192.168.1.100" }]
        }
    })
}

fn wifi_details_payload() -> Value {
    json!({
        "code": 0,
        "bsd": 0,
        "info": [
            {
                "ifname": "wl0",
                "channelInfo": { "bandwidth": "80", "bandList": ["5"], "channel": 149 },
                "encryption": "psk2",
                "bandwidth": "80",
                "ssid": "MiWiFi_5G",
                "status": "1",
                "channel": "149",
                "device": "wl0",
                "txpwr": "max"
            },
            {
                "ifname": "wl1",
                "channelInfo": { "bandwidth": "20", "bandList": ["2.4"], "channel": 6 },
                "encryption": "psk2",
                "bandwidth": "20",
                "ssid": "MiWiFi_2.4G",
                "status": "1",
                "channel": "6",
                "device": "wl1",
                "txpwr": "max"
            }
        ]
    })
}

/// Knobs for one simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    /// Collection rounds to run
    pub rounds: u32,
    /// Pause between rounds
    pub interval: Duration,
    pub latency: Duration,
    pub failure_rate: f64,
    /// Install the simulated router as the cache's background loader
    pub background: bool,
}

impl SimulationOptions {
    /// Options taken from the `[simulation]` section
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rounds: 5,
            interval: Duration::from_secs(1),
            latency: config.simulation.latency(),
            failure_rate: config.simulation.failure_rate,
            background: true,
        }
    }
}

/// Where one round's data came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundSource {
    Cache,
    Fetch,
    /// Some fields failed; the message is the round's error
    Partial(String),
}

impl RoundSource {
    pub fn label(&self) -> &'static str {
        match self {
            RoundSource::Cache => "cache",
            RoundSource::Fetch => "fetch",
            RoundSource::Partial(_) => "partial",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// One-based round number
    pub round: u32,
    pub source: RoundSource,
    /// Fields present in the snapshot handed back
    pub fields: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub rounds: Vec<RoundOutcome>,
    pub stats: CacheStats,
    pub router_calls: u64,
}

/// Drive `options.rounds` collection rounds through a fresh [`RouterCache`]
///
/// `on_round` sees every outcome as soon as it is known. The cache is stopped
/// before returning.
pub async fn run_simulation(
    config: &AppConfig,
    options: &SimulationOptions,
    mut on_round: impl FnMut(&RoundOutcome),
) -> Result<SimulationSummary> {
    config.validate().context("Invalid configuration")?;
    if !(0.0..=1.0).contains(&options.failure_rate) {
        anyhow::bail!("failure rate must be between 0 and 1");
    }

    let core = config.core();
    let router = Arc::new(SimulatedRouter::new(options.latency, options.failure_rate));
    let client: Arc<dyn RouterClient> = router.clone();
    let cache = RouterCache::new(core.cache.router_cache_config());
    let fetcher = DataFetcher::new(core.fetcher.fetcher_config());

    if options.background {
        cache
            .set_data_loader(client.clone(), core.cache.refresh_interval())
            .context("Failed to install background loader")?;
    }

    let ctx = FetchContext::background();
    let mut rounds = Vec::with_capacity(options.rounds as usize);
    for round in 1..=options.rounds {
        if round > 1 && !options.interval.is_zero() {
            tokio::time::sleep(options.interval).await;
        }

        let started = Instant::now();
        let (source, fields) = match cache.get_or_fetch(&ctx, &fetcher, client.clone()).await {
            Ok(lookup) => {
                let source = match lookup.source {
                    SnapshotSource::Cache => RoundSource::Cache,
                    SnapshotSource::Fetch => RoundSource::Fetch,
                };
                (source, lookup.snapshot.populated_count())
            }
            Err(partial) => (
                RoundSource::Partial(partial.error.to_string()),
                partial.snapshot.populated_count(),
            ),
        };

        let outcome = RoundOutcome {
            round,
            source,
            fields,
            elapsed: started.elapsed(),
        };
        debug!(
            "Round {} served from {} with {} fields",
            outcome.round,
            outcome.source.label(),
            outcome.fields
        );
        on_round(&outcome);
        rounds.push(outcome);
    }

    let stats = cache.stats().await;
    cache.stop().await;
    info!(
        "Simulation finished: {} rounds, {} router calls",
        rounds.len(),
        router.calls()
    );

    Ok(SimulationSummary {
        rounds,
        stats,
        router_calls: router.calls(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationSettings;
    use miwifi_core::config::{CacheSettings, FetcherSettings};

    fn fast_config() -> AppConfig {
        AppConfig {
            cache: CacheSettings {
                ttl_secs: 60,
                ..Default::default()
            },
            fetcher: FetcherSettings {
                max_retries: 1,
                retry_delay_ms: 0,
                ..Default::default()
            },
            simulation: SimulationSettings {
                latency_ms: 0,
                failure_rate: 0.0,
            },
        }
    }

    fn options(rounds: u32, failure_rate: f64) -> SimulationOptions {
        SimulationOptions {
            rounds,
            interval: Duration::ZERO,
            latency: Duration::ZERO,
            failure_rate,
            background: false,
        }
    }

    #[test]
    fn test_failure_pattern_is_exact() {
        let router = SimulatedRouter::new(Duration::ZERO, 0.25);
        let failures = (0..100).filter(|call| router.should_fail(*call)).count();
        assert_eq!(failures, 25);

        let never = SimulatedRouter::new(Duration::ZERO, 0.0);
        assert!((0..100).all(|call| !never.should_fail(call)));

        let always = SimulatedRouter::new(Duration::ZERO, 1.0);
        assert!((0..100).all(|call| always.should_fail(call)));
    }

    #[tokio::test]
    async fn test_payloads_decode() {
        let router = SimulatedRouter::new(Duration::ZERO, 0.0);
        let ctx = FetchContext::background();

        let status = router.get_system_status(&ctx).await.unwrap();
        assert_eq!(status.hardware.platform, "R3P");
        assert_eq!(status.cpu.core, 4);

        let devices = router.get_device_list(&ctx).await.unwrap();
        assert_eq!(devices.list.len(), 1);

        let wan = router.get_wan_info(&ctx).await.unwrap();
        assert_eq!(wan.info.ipv4[0].ip, "192.168.1.100");

        let wifi = router.get_wifi_details(&ctx).await.unwrap();
        assert_eq!(wifi.info[0].channel_info.channel, 149);
        assert_eq!(router.calls(), 4);
    }

    #[tokio::test]
    async fn test_first_round_fetches_then_cache_serves() {
        let summary = run_simulation(&fast_config(), &options(3, 0.0), |_| {})
            .await
            .unwrap();

        let sources: Vec<&str> = summary.rounds.iter().map(|r| r.source.label()).collect();
        assert_eq!(sources, vec!["fetch", "cache", "cache"]);
        assert_eq!(summary.router_calls, 4);
        assert_eq!(summary.stats.size, 4);
        assert!(summary.rounds.iter().all(|r| r.fields == 4));
    }

    #[tokio::test]
    async fn test_total_failure_reports_partial_rounds() {
        let summary = run_simulation(&fast_config(), &options(2, 1.0), |_| {})
            .await
            .unwrap();

        for outcome in &summary.rounds {
            assert!(matches!(outcome.source, RoundSource::Partial(_)));
            assert_eq!(outcome.fields, 0);
        }
        assert_eq!(summary.router_calls, 8);
    }

    #[tokio::test]
    async fn test_disabled_cache_fetches_every_round() {
        let mut config = fast_config();
        config.cache.enabled = false;

        let mut seen = 0;
        let summary = run_simulation(&config, &options(3, 0.0), |_| seen += 1)
            .await
            .unwrap();

        assert_eq!(seen, 3);
        assert!(summary.rounds.iter().all(|r| r.source == RoundSource::Fetch));
        assert_eq!(summary.router_calls, 12);
    }

    #[tokio::test]
    async fn test_invalid_failure_rate_rejected() {
        let result = run_simulation(&fast_config(), &options(1, 2.0), |_| {}).await;
        assert!(result.is_err());
    }
}

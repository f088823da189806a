//! Scriptable in-memory router client

use crate::builders::RouterDataBuilder;
use async_trait::async_trait;
use miwifi_core::context::FetchContext;
use miwifi_core::error::{RemoteError, Result};
use miwifi_core::models::{DeviceList, SystemStatus, WanInfo, WifiDetailAll};
use miwifi_core::{RouterClient, RouterDataSnapshot, RouterField};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
struct FieldScript {
    delay: Duration,
    /// Number of leading calls that fail; `u32::MAX` fails forever
    failures: u32,
}

/// Router client with per-operation latency, scripted failures and call counters
///
/// Calls honour the context: a call that is still sleeping when the context
/// fires returns the context's cancellation error.
///
/// # Examples
///
/// ```rust,no_run
/// use miwifi_test_utils::MockRouterClient;
/// use miwifi_core::RouterField;
/// use std::time::Duration;
///
/// let client = MockRouterClient::new()
///     .with_delay(RouterField::WifiDetails, Duration::from_millis(200))
///     .failing(RouterField::WanInfo);
/// ```
pub struct MockRouterClient {
    data: RouterDataSnapshot,
    scripts: Mutex<[FieldScript; 4]>,
    calls: [AtomicU32; 4],
}

impl MockRouterClient {
    /// Client answering with sample data and no latency
    pub fn new() -> Self {
        Self::with_data(RouterDataBuilder::new().build())
    }

    /// Client answering with the given payloads; empty fields return defaults
    pub fn with_data(data: RouterDataSnapshot) -> Self {
        Self {
            data,
            scripts: Mutex::new([FieldScript::default(); 4]),
            calls: Default::default(),
        }
    }

    /// Delay every call for `field`
    pub fn with_delay(self, field: RouterField, delay: Duration) -> Self {
        self.script(field, |script| script.delay = delay);
        self
    }

    /// Per-field delays in milliseconds, in [`RouterField::ALL`] order
    pub fn with_delays_ms(self, delays: [u64; 4]) -> Self {
        for (field, millis) in RouterField::ALL.into_iter().zip(delays) {
            self.script(field, |script| script.delay = Duration::from_millis(millis));
        }
        self
    }

    /// Every call for `field` fails
    pub fn failing(self, field: RouterField) -> Self {
        self.failing_times(field, u32::MAX)
    }

    /// The first `times` calls for `field` fail
    pub fn failing_times(self, field: RouterField, times: u32) -> Self {
        self.script(field, |script| script.failures = times);
        self
    }

    /// Change the failure script of a shared client
    pub fn set_failures(&self, field: RouterField, times: u32) {
        self.script(field, |script| script.failures = times);
    }

    /// Calls made for `field`
    pub fn calls(&self, field: RouterField) -> u32 {
        self.calls[field.id()].load(Ordering::SeqCst)
    }

    /// Calls made across all fields
    pub fn total_calls(&self) -> u32 {
        RouterField::ALL.iter().map(|field| self.calls(*field)).sum()
    }

    fn script(&self, field: RouterField, update: impl FnOnce(&mut FieldScript)) {
        let mut scripts = self.scripts.lock().unwrap();
        update(&mut scripts[field.id()]);
    }

    /// Sleep, then decide whether this call fails
    async fn call(&self, ctx: &FetchContext, field: RouterField) -> Result<()> {
        self.calls[field.id()].fetch_add(1, Ordering::SeqCst);

        let (delay, fail) = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = &mut scripts[field.id()];
            let fail = script.failures > 0;
            if fail && script.failures != u32::MAX {
                script.failures -= 1;
            }
            (script.delay, fail)
        };

        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = ctx.cancelled() => return Err(ctx.cancellation_error().into()),
            }
        }

        if fail {
            return Err(RemoteError::network(field.operation(), "mock failure").into());
        }
        Ok(())
    }
}

impl Default for MockRouterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouterClient for MockRouterClient {
    async fn get_system_status(&self, ctx: &FetchContext) -> Result<SystemStatus> {
        self.call(ctx, RouterField::SystemStatus).await?;
        Ok(self.data.system_status.as_deref().cloned().unwrap_or_default())
    }

    async fn get_device_list(&self, ctx: &FetchContext) -> Result<DeviceList> {
        self.call(ctx, RouterField::DeviceList).await?;
        Ok(self.data.device_list.as_deref().cloned().unwrap_or_default())
    }

    async fn get_wan_info(&self, ctx: &FetchContext) -> Result<WanInfo> {
        self.call(ctx, RouterField::WanInfo).await?;
        Ok(self.data.wan_info.as_deref().cloned().unwrap_or_default())
    }

    async fn get_wifi_details(&self, ctx: &FetchContext) -> Result<WifiDetailAll> {
        self.call(ctx, RouterField::WifiDetails).await?;
        Ok(self.data.wifi_details.as_deref().cloned().unwrap_or_default())
    }
}

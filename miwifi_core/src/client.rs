//! Router data source abstraction
//!
//! The core never talks to the router directly. Anything that can produce the
//! four artifacts under a [`FetchContext`] can drive the fetcher and the
//! background refresher.

use crate::context::FetchContext;
use crate::error::Result;
use crate::models::{DeviceList, SystemStatus, WanInfo, WifiDetailAll};
use crate::snapshot::{RouterArtifact, RouterField};
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the router
///
/// Implementations are expected to honour the context's deadline and
/// cancellation in their own I/O.
#[async_trait]
pub trait RouterClient: Send + Sync {
    /// Fetch `misystem/status`
    async fn get_system_status(&self, ctx: &FetchContext) -> Result<SystemStatus>;

    /// Fetch `misystem/devicelist`
    async fn get_device_list(&self, ctx: &FetchContext) -> Result<DeviceList>;

    /// Fetch `xqnetwork/wan_info`
    async fn get_wan_info(&self, ctx: &FetchContext) -> Result<WanInfo>;

    /// Fetch `xqnetwork/wifi_detail_all`
    async fn get_wifi_details(&self, ctx: &FetchContext) -> Result<WifiDetailAll>;
}

/// Loader used by the background refresher; any [`RouterClient`] qualifies
pub type DataLoader = dyn RouterClient;

/// Fetch one field and tag it with its artifact variant
pub async fn fetch_field(
    client: &Arc<dyn RouterClient>,
    ctx: &FetchContext,
    field: RouterField,
) -> Result<RouterArtifact> {
    let artifact = match field {
        RouterField::SystemStatus => {
            RouterArtifact::SystemStatus(Arc::new(client.get_system_status(ctx).await?))
        }
        RouterField::DeviceList => {
            RouterArtifact::DeviceList(Arc::new(client.get_device_list(ctx).await?))
        }
        RouterField::WanInfo => RouterArtifact::WanInfo(Arc::new(client.get_wan_info(ctx).await?)),
        RouterField::WifiDetails => {
            RouterArtifact::WifiDetails(Arc::new(client.get_wifi_details(ctx).await?))
        }
    };
    Ok(artifact)
}

//! Aggregated router data
//!
//! A [`RouterDataSnapshot`] holds up to four independently optional artifacts.
//! Only a snapshot with all four present is complete.

use crate::models::{DeviceList, SystemStatus, WanInfo, WifiDetailAll};
use std::fmt;
use std::sync::Arc;

/// The four artifacts fetched from the router
///
/// The discriminant doubles as the task id inside a fetch round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouterField {
    SystemStatus = 0,
    DeviceList = 1,
    WanInfo = 2,
    WifiDetails = 3,
}

impl RouterField {
    /// All fields in id order
    pub const ALL: [RouterField; 4] = [
        RouterField::SystemStatus,
        RouterField::DeviceList,
        RouterField::WanInfo,
        RouterField::WifiDetails,
    ];

    /// Positional task id
    pub fn id(self) -> usize {
        self as usize
    }

    /// Look up a field by task id
    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    /// Well-known cache key
    pub fn cache_key(self) -> &'static str {
        match self {
            RouterField::SystemStatus => "system_status",
            RouterField::DeviceList => "device_list",
            RouterField::WanInfo => "wan_info",
            RouterField::WifiDetails => "wifi_details",
        }
    }

    /// Name of the data source operation that produces this field
    pub fn operation(self) -> &'static str {
        match self {
            RouterField::SystemStatus => "get_system_status",
            RouterField::DeviceList => "get_device_list",
            RouterField::WanInfo => "get_wan_info",
            RouterField::WifiDetails => "get_wifi_details",
        }
    }
}

impl fmt::Display for RouterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key())
    }
}

/// One fetched artifact, tagged with the field it belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum RouterArtifact {
    SystemStatus(Arc<SystemStatus>),
    DeviceList(Arc<DeviceList>),
    WanInfo(Arc<WanInfo>),
    WifiDetails(Arc<WifiDetailAll>),
}

impl RouterArtifact {
    /// The field this artifact fills
    pub fn field(&self) -> RouterField {
        match self {
            RouterArtifact::SystemStatus(_) => RouterField::SystemStatus,
            RouterArtifact::DeviceList(_) => RouterField::DeviceList,
            RouterArtifact::WanInfo(_) => RouterField::WanInfo,
            RouterArtifact::WifiDetails(_) => RouterField::WifiDetails,
        }
    }
}

/// Best-effort aggregate of one fetch round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterDataSnapshot {
    pub system_status: Option<Arc<SystemStatus>>,
    pub device_list: Option<Arc<DeviceList>>,
    pub wan_info: Option<Arc<WanInfo>>,
    pub wifi_details: Option<Arc<WifiDetailAll>>,
}

impl RouterDataSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an artifact into its slot, replacing any previous value
    pub fn insert(&mut self, artifact: RouterArtifact) {
        match artifact {
            RouterArtifact::SystemStatus(v) => self.system_status = Some(v),
            RouterArtifact::DeviceList(v) => self.device_list = Some(v),
            RouterArtifact::WanInfo(v) => self.wan_info = Some(v),
            RouterArtifact::WifiDetails(v) => self.wifi_details = Some(v),
        }
    }

    /// Read the artifact stored for `field`
    pub fn get(&self, field: RouterField) -> Option<RouterArtifact> {
        match field {
            RouterField::SystemStatus => self
                .system_status
                .clone()
                .map(RouterArtifact::SystemStatus),
            RouterField::DeviceList => self.device_list.clone().map(RouterArtifact::DeviceList),
            RouterField::WanInfo => self.wan_info.clone().map(RouterArtifact::WanInfo),
            RouterField::WifiDetails => self.wifi_details.clone().map(RouterArtifact::WifiDetails),
        }
    }

    /// Whether `field` is populated
    pub fn contains(&self, field: RouterField) -> bool {
        match field {
            RouterField::SystemStatus => self.system_status.is_some(),
            RouterField::DeviceList => self.device_list.is_some(),
            RouterField::WanInfo => self.wan_info.is_some(),
            RouterField::WifiDetails => self.wifi_details.is_some(),
        }
    }

    /// All present artifacts in field order
    pub fn artifacts(&self) -> Vec<RouterArtifact> {
        RouterField::ALL
            .iter()
            .filter_map(|field| self.get(*field))
            .collect()
    }

    /// Fields that are still empty
    pub fn missing_fields(&self) -> Vec<RouterField> {
        RouterField::ALL
            .into_iter()
            .filter(|field| !self.contains(*field))
            .collect()
    }

    /// Number of populated fields
    pub fn populated_count(&self) -> usize {
        RouterField::ALL
            .iter()
            .filter(|field| self.contains(**field))
            .count()
    }

    /// True only when all four fields are present
    pub fn is_complete(&self) -> bool {
        self.populated_count() == RouterField::ALL.len()
    }
}

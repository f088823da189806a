//! Router payload types
//!
//! These mirror the JSON returned by the router's `misystem` and `xqnetwork`
//! APIs. Fields the firmware reports as either numbers or strings are kept as
//! [`serde_json::Value`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `misystem/status` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub dev: Vec<DeviceTraffic>,
    pub code: i64,
    pub mem: MemoryInfo,
    pub temperature: i64,
    pub count: DeviceCount,
    pub hardware: HardwareInfo,
    #[serde(rename = "upTime")]
    pub up_time: String,
    pub cpu: CpuInfo,
    pub wan: WanTraffic,
}

/// Per-device traffic counters inside [`SystemStatus`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceTraffic {
    pub mac: String,
    #[serde(rename = "maxdownloadspeed")]
    pub max_download_speed: String,
    pub upload: Value,
    #[serde(rename = "upspeed")]
    pub up_speed: Value,
    #[serde(rename = "downspeed")]
    pub down_speed: Value,
    pub online: String,
    #[serde(rename = "devname")]
    pub dev_name: String,
    #[serde(rename = "maxuploadspeed")]
    pub max_upload_speed: String,
    pub download: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryInfo {
    pub usage: f64,
    pub total: String,
    pub hz: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCount {
    pub all: i64,
    pub online: i64,
    pub all_without_mash: i64,
    pub online_without_mash: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareInfo {
    pub mac: String,
    pub platform: String,
    pub version: String,
    pub channel: String,
    pub sn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuInfo {
    pub core: i64,
    pub hz: String,
    pub load: f64,
}

/// Aggregate WAN traffic inside [`SystemStatus`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanTraffic {
    #[serde(rename = "downspeed")]
    pub down_speed: String,
    #[serde(rename = "maxdownloadspeed")]
    pub max_download_speed: String,
    pub history: String,
    #[serde(rename = "devname")]
    pub dev_name: String,
    pub upload: String,
    #[serde(rename = "upspeed")]
    pub up_speed: String,
    #[serde(rename = "maxuploadspeed")]
    pub max_upload_speed: String,
    pub download: String,
}

/// `misystem/devicelist` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceList {
    pub mac: String,
    pub list: Vec<DeviceEntry>,
    pub code: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceEntry {
    pub mac: String,
    #[serde(rename = "oname")]
    pub origin_name: String,
    #[serde(rename = "isap")]
    pub is_ap: i64,
    pub parent: String,
    pub authority: AuthorityInfo,
    pub push: i64,
    pub online: i64,
    pub name: String,
    pub times: i64,
    pub ip: Vec<DeviceAddress>,
    pub statistics: DeviceStatistics,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityInfo {
    pub wan: i64,
    #[serde(rename = "pridisk")]
    pub pri_disk: i64,
    pub admin: i64,
    pub lan: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceAddress {
    #[serde(rename = "downspeed")]
    pub down_speed: String,
    pub online: String,
    pub active: i64,
    #[serde(rename = "upspeed")]
    pub up_speed: String,
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceStatistics {
    #[serde(rename = "downspeed")]
    pub down_speed: String,
    pub online: String,
    #[serde(rename = "upspeed")]
    pub up_speed: String,
}

/// `xqnetwork/wan_info` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanInfo {
    pub info: WanInfoDetails,
    pub code: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanInfoDetails {
    pub mac: String,
    pub mtu: String,
    pub details: WanConfig,
    #[serde(rename = "gateWay")]
    pub gateway: String,
    #[serde(rename = "dnsAddrs1")]
    pub dns_addr_secondary: String,
    pub status: i64,
    pub uptime: i64,
    #[serde(rename = "dnsAddrs")]
    pub dns_addr: String,
    pub ipv6_info: Ipv6Info,
    pub ipv6_show: i64,
    pub link: i64,
    pub ipv4: Vec<Ipv4Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanConfig {
    pub username: String,
    #[serde(rename = "ifname")]
    pub if_name: String,
    #[serde(rename = "wanType")]
    pub wan_type: String,
    pub service: String,
    pub password: String,
    #[serde(rename = "peerdns")]
    pub peer_dns: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ipv6Info {
    #[serde(rename = "wanType")]
    pub wan_type: String,
    #[serde(rename = "ifname")]
    pub if_name: String,
    pub dns: Vec<Value>,
    #[serde(rename = "ip6addr")]
    pub ip6_addr: Vec<String>,
    #[serde(rename = "peerdns")]
    pub peer_dns: String,
    #[serde(rename = "lan_ip6prefix")]
    pub lan_ip6_prefix: Vec<Value>,
    #[serde(rename = "lan_ip6addr")]
    pub lan_ip6_addr: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ipv4Address {
    pub mask: String,
    pub ip: String,
}

/// `xqnetwork/wifi_detail_all` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiDetailAll {
    pub bsd: i64,
    pub info: Vec<WifiDetails>,
    pub code: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiDetails {
    #[serde(rename = "ifname")]
    pub if_name: String,
    #[serde(rename = "channelInfo")]
    pub channel_info: ChannelInfo,
    pub encryption: String,
    pub bandwidth: String,
    #[serde(rename = "kickthreshold")]
    pub kick_threshold: String,
    pub status: String,
    pub mode: String,
    pub bsd: String,
    pub ssid: String,
    #[serde(rename = "weakthreshold")]
    pub weak_threshold: String,
    pub device: String,
    pub ax: String,
    pub hidden: String,
    pub password: String,
    pub channel: String,
    #[serde(rename = "txpwr")]
    pub tx_power: String,
    #[serde(rename = "weakenable")]
    pub weak_enable: String,
    #[serde(rename = "txbf")]
    pub tx_beamforming: String,
    pub signal: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelInfo {
    pub bandwidth: String,
    #[serde(rename = "bandList")]
    pub band_list: Vec<String>,
    pub channel: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_status_decodes_router_field_names() {
        let json = r#"{
            "code": 0,
            "upTime": "86400",
            "cpu": {"core": 4, "hz": "800MHz", "load": 0.25},
            "mem": {"usage": 0.65, "total": "256MB", "type": "DDR3"},
            "count": {"all": 3, "online": 2, "all_without_mash": 3, "online_without_mash": 2},
            "dev": [{"mac": "aa:bb:cc:dd:ee:ff", "upload": 1048576, "download": "2097152"}]
        }"#;

        let status: SystemStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.up_time, "86400");
        assert_eq!(status.cpu.core, 4);
        assert_eq!(status.mem.kind, "DDR3");
        assert_eq!(status.count.online, 2);
        assert_eq!(status.dev.len(), 1);
        assert_eq!(status.dev[0].upload, Value::from(1048576));
        assert_eq!(status.dev[0].download, Value::from("2097152"));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let wifi: WifiDetailAll = serde_json::from_str(r#"{"info": [{"ssid": "home"}]}"#).unwrap();
        assert_eq!(wifi.code, 0);
        assert_eq!(wifi.info[0].ssid, "home");
        assert!(wifi.info[0].channel_info.band_list.is_empty());
    }

    #[test]
    fn test_wan_info_renamed_fields() {
        let json = r#"{"info": {"gateWay": "10.0.0.1", "dnsAddrs": "1.1.1.1",
            "details": {"wanType": "pppoe", "ifname": "pppoe-wan"},
            "ipv4": [{"ip": "100.64.0.2", "mask": "255.255.255.0"}]}, "code": 0}"#;

        let wan: WanInfo = serde_json::from_str(json).unwrap();
        assert_eq!(wan.info.gateway, "10.0.0.1");
        assert_eq!(wan.info.dns_addr, "1.1.1.1");
        assert_eq!(wan.info.details.wan_type, "pppoe");
        assert_eq!(wan.info.ipv4[0].ip, "100.64.0.2");
    }
}

//! Sample router payloads

use miwifi_core::RouterDataSnapshot;
use miwifi_core::models::{
    ChannelInfo, CpuInfo, DeviceAddress, DeviceCount, DeviceEntry, DeviceList, DeviceStatistics,
    DeviceTraffic, HardwareInfo, Ipv4Address, MemoryInfo, SystemStatus, WanInfo, WanInfoDetails,
    WanTraffic, WifiDetailAll, WifiDetails,
};
use serde_json::Value;
use std::sync::Arc;

/// Builder for a complete, realistic [`RouterDataSnapshot`]
///
/// Defaults to three online devices, a 5 GHz and a 2.4 GHz network and a
/// quad-core router.
#[derive(Debug, Clone)]
pub struct RouterDataBuilder {
    platform: String,
    devices: usize,
    networks: Vec<(String, i64)>,
    cpu_load: f64,
    wan_ip: String,
}

impl RouterDataBuilder {
    pub fn new() -> Self {
        Self {
            platform: "miwifi_r3p".to_string(),
            devices: 3,
            networks: vec![
                ("MiWiFi_5G".to_string(), 149),
                ("MiWiFi_2.4G".to_string(), 6),
            ],
            cpu_load: 25.5,
            wan_ip: "100.100.100.100".to_string(),
        }
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn with_devices(mut self, devices: usize) -> Self {
        self.devices = devices;
        self
    }

    /// Replace the Wi-Fi networks with `(ssid, channel)` pairs
    pub fn with_networks(mut self, networks: &[(&str, i64)]) -> Self {
        self.networks = networks
            .iter()
            .map(|(ssid, channel)| (ssid.to_string(), *channel))
            .collect();
        self
    }

    pub fn with_cpu_load(mut self, load: f64) -> Self {
        self.cpu_load = load;
        self
    }

    pub fn with_wan_ip(mut self, ip: &str) -> Self {
        self.wan_ip = ip.to_string();
        self
    }

    pub fn system_status(&self) -> SystemStatus {
        let devices = self.devices as i64;
        SystemStatus {
            dev: (0..self.devices).map(device_traffic).collect(),
            mem: MemoryInfo {
                usage: 0.65,
                total: "256MB".to_string(),
                ..Default::default()
            },
            count: DeviceCount {
                all: devices,
                online: devices,
                all_without_mash: devices,
                online_without_mash: devices,
            },
            hardware: HardwareInfo {
                platform: self.platform.clone(),
                version: "2.28.62".to_string(),
                sn: "12345/A0B1C2".to_string(),
                mac: "8c:de:f9:00:00:01".to_string(),
                ..Default::default()
            },
            cpu: CpuInfo {
                core: 4,
                hz: "800000000".to_string(),
                load: self.cpu_load,
            },
            wan: WanTraffic {
                up_speed: "100.5".to_string(),
                down_speed: "200.8".to_string(),
                upload: "1073741824".to_string(),
                download: "2147483648".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn device_list(&self) -> DeviceList {
        DeviceList {
            list: (0..self.devices).map(device_entry).collect(),
            ..Default::default()
        }
    }

    pub fn wan_info(&self) -> WanInfo {
        WanInfo {
            info: WanInfoDetails {
                ipv4: vec![Ipv4Address {
                    ip: self.wan_ip.clone(),
                    mask: "255.255.255.0".to_string(),
                }],
                link: 1,
                status: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn wifi_details(&self) -> WifiDetailAll {
        WifiDetailAll {
            info: self
                .networks
                .iter()
                .map(|(ssid, channel)| WifiDetails {
                    ssid: ssid.clone(),
                    status: "1".to_string(),
                    channel_info: ChannelInfo {
                        band_list: vec![if *channel > 14 { "5" } else { "2.4" }.to_string()],
                        channel: *channel,
                        ..Default::default()
                    },
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    /// All four fields populated
    pub fn build(&self) -> RouterDataSnapshot {
        RouterDataSnapshot {
            system_status: Some(Arc::new(self.system_status())),
            device_list: Some(Arc::new(self.device_list())),
            wan_info: Some(Arc::new(self.wan_info())),
            wifi_details: Some(Arc::new(self.wifi_details())),
        }
    }
}

impl Default for RouterDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn device_mac(index: usize) -> String {
    format!("aa:bb:cc:dd:ee:{index:02x}")
}

fn device_traffic(index: usize) -> DeviceTraffic {
    let upload = 262_144u64 << (index % 3);
    DeviceTraffic {
        mac: device_mac(index),
        upload: Value::from(upload.to_string()),
        download: Value::from((upload * 2).to_string()),
        online: "1".to_string(),
        ..Default::default()
    }
}

fn device_entry(index: usize) -> DeviceEntry {
    DeviceEntry {
        mac: device_mac(index),
        name: format!("device-{index}"),
        online: 1,
        ip: vec![DeviceAddress {
            ip: format!("192.168.31.{}", 100 + index),
            online: "3600".to_string(),
            ..Default::default()
        }],
        statistics: DeviceStatistics {
            online: "3600".to_string(),
            up_speed: "1024".to_string(),
            down_speed: "2048".to_string(),
        },
        ..Default::default()
    }
}

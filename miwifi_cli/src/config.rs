//! Layered configuration for the CLI
//!
//! Defaults, then the TOML file, then `MIWIFI_` environment variables with
//! `__` separating nested keys (`MIWIFI_CACHE__TTL_SECS=20`).

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use miwifi_core::config::{CacheSettings, CoreConfig, FetcherSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "MIWIFI_";
const APP_DIR: &str = "miwifi-cache";

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub fetcher: FetcherSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Behaviour of the simulated router used by `simulate`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    /// Latency of every simulated call
    pub latency_ms: u64,
    /// Fraction of calls that fail, between 0 and 1
    pub failure_rate: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            latency_ms: 20,
            failure_rate: 0.0,
        }
    }
}

impl SimulationSettings {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl AppConfig {
    /// Settings consumed by the core library
    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            cache: self.cache.clone(),
            fetcher: self.fetcher.clone(),
        }
    }

    /// Validate core settings and the simulation section
    pub fn validate(&self) -> Result<()> {
        self.core().validate()?;
        if !(0.0..=1.0).contains(&self.simulation.failure_rate) {
            anyhow::bail!("simulation.failure_rate must be between 0 and 1");
        }
        Ok(())
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a ConfigManager with the default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Use `path` when given, otherwise the default location
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or_else(Self::new, Self::with_path)
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Get the default XDG-compliant configuration path
    fn default_config_path() -> PathBuf {
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join(APP_DIR).join("config.toml");
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Merged configuration rendered as TOML
    pub fn show(&self) -> Result<String> {
        let config = self.load()?;
        toml::to_string_pretty(&config).context("Failed to render configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let value = self.merged_value()?;
        let mut current = &value;

        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation) in the config file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed = Self::parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)
                .with_context(|| format!("Failed to read {}", self.config_path.display()))?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }
        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), parsed);

        // Reject the write if the result would not load
        let candidate: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(&toml::to_string(&config)?))
            .extract()
            .with_context(|| format!("Invalid value for '{key}'"))?;
        candidate.validate()?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)?;
        Ok(())
    }

    /// List all configuration values, sorted by key
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let value = self.merged_value()?;
        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(items)
    }

    fn merged_value(&self) -> Result<toml::Value> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        Ok(toml::from_str(&toml_string)?)
    }

    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Float(f) => items.push((prefix, f.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {}
        }
    }

    /// Parse a value to the TOML type its key expects
    fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
        match key {
            k if k.ends_with("_secs")
                || k.ends_with("_ms")
                || k.ends_with("_limit")
                || k.ends_with("_retries")
                || k.ends_with("_workers") =>
            {
                let num: i64 = value.parse().context("Expected integer value")?;
                if num < 0 {
                    anyhow::bail!("'{key}' cannot be negative");
                }
                Ok(toml::Value::Integer(num))
            }
            k if k.ends_with("_rate") => {
                let rate: f64 = value.parse().context("Expected a number")?;
                Ok(toml::Value::Float(rate))
            }
            "cache.enabled" | "cache.preload" => {
                let flag: bool = value
                    .parse()
                    .context("Expected boolean value (true/false)")?;
                Ok(toml::Value::Boolean(flag))
            }
            _ => {
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else if let Ok(f) = value.parse::<f64>() {
                    Ok(toml::Value::Float(f))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> ConfigManager {
        ConfigManager::with_path(dir.path().join("config.toml"))
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = manager(&dir).load().unwrap();

        assert_eq!(config.cache.ttl_secs, 10);
        assert_eq!(config.fetcher.max_workers, 4);
        assert_eq!(config.simulation.latency_ms, 20);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[cache]\nttl_secs = 42\n\n[fetcher]\nmax_retries = 5\n",
        )
        .unwrap();

        let config = manager(&dir).load().unwrap();
        assert_eq!(config.cache.ttl_secs, 42);
        assert_eq!(config.cache.size_limit, 1000);
        assert_eq!(config.fetcher.max_retries, 5);
    }

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        manager.set("cache.size_limit", "64").unwrap();
        manager.set("cache.preload", "false").unwrap();

        assert_eq!(manager.get("cache.size_limit").unwrap(), "64");
        assert_eq!(manager.get("cache.preload").unwrap(), "false");
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        assert!(manager.set("cache.ttl_secs", "0").is_err());
        assert!(manager.set("fetcher.max_workers", "-1").is_err());
        assert!(manager.set("simulation.failure_rate", "1.5").is_err());
        assert!(!dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_unknown_key() {
        let dir = TempDir::new().unwrap();
        assert!(manager(&dir).get("cache.nope").is_err());
    }

    #[test]
    fn test_list_is_sorted_and_flat() {
        let dir = TempDir::new().unwrap();
        let items = manager(&dir).list().unwrap();

        let keys: Vec<&str> = items.iter().map(|(k, _)| k.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert!(keys.contains(&"fetcher.retry_delay_ms"));
    }

    #[test]
    fn test_show_renders_sections() {
        let dir = TempDir::new().unwrap();
        let rendered = manager(&dir).show().unwrap();
        assert!(rendered.contains("[cache]"));
        assert!(rendered.contains("[fetcher]"));
        assert!(rendered.contains("[simulation]"));
    }
}

use crate::error::ConfigError;
use crate::sensors::Unit;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Kernel location of one-wire bus devices.
pub const DEFAULT_DEVICES_DIR: &str = "/sys/bus/w1/devices/";

/// Family code prefix of DS18B20 thermometers.
pub const DEFAULT_FAMILY_PREFIX: &str = "28-";

/// Per-device file holding the raw reading.
pub const DEFAULT_DATA_FILE: &str = "w1_slave";

/// Load environment variables from .env file.
/// Values may contain spaces without quotes; variables already set win.
///
/// Runs before logging is set up, so a read failure is returned for the
/// caller to report once it can.
pub fn load_dotenv() -> io::Result<()> {
    load_dotenv_from(Path::new(".env"))
}

/// Like [`load_dotenv`], reading from `env_path`. A missing file is not an error.
pub fn load_dotenv_from(env_path: &Path) -> io::Result<()> {
    if !env_path.exists() {
        return Ok(());
    }

    let content = fs::read_to_string(env_path)?;
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            // SAFETY: called from main before the runtime spawns any threads
            unsafe { std::env::set_var(key, value) };
        }
    }
    Ok(())
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim(), unquoted)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub devices_dir: PathBuf,
    pub family_prefix: String,
    pub data_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub interval_ms: u64,
    pub unit: Unit,
    /// Queue depth of each output channel.
    pub channel_capacity: usize,
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig {
                devices_dir: PathBuf::from(DEFAULT_DEVICES_DIR),
                family_prefix: DEFAULT_FAMILY_PREFIX.to_string(),
                data_file: DEFAULT_DATA_FILE.to_string(),
            },
            watch: WatchConfig {
                interval_ms: 1000,
                unit: Unit::Fahrenheit,
                channel_capacity: 1,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from defaults overridden by `lookup(key)`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("W1_DEVICES_DIR") {
            config.discovery.devices_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = lookup("W1_FAMILY_PREFIX") {
            config.discovery.family_prefix = prefix;
        }
        if let Some(file) = lookup("W1_DATA_FILE") {
            config.discovery.data_file = file;
        }
        if let Some(ms) = lookup("W1_POLL_INTERVAL_MS") {
            let ms: u64 = parse_value("W1_POLL_INTERVAL_MS", ms)?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "W1_POLL_INTERVAL_MS",
                    value: ms.to_string(),
                });
            }
            config.watch.interval_ms = ms;
        }
        if let Some(unit) = lookup("W1_UNIT") {
            config.watch.unit = parse_value("W1_UNIT", unit)?;
        }
        if let Some(capacity) = lookup("W1_CHANNEL_CAPACITY") {
            let capacity: usize = parse_value("W1_CHANNEL_CAPACITY", capacity)?;
            if capacity == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "W1_CHANNEL_CAPACITY",
                    value: capacity.to_string(),
                });
            }
            config.watch.channel_capacity = capacity;
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.discovery.devices_dir, PathBuf::from("/sys/bus/w1/devices/"));
        assert_eq!(config.watch.interval(), Duration::from_secs(1));
        assert_eq!(config.watch.unit, Unit::Fahrenheit);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("W1_DEVICES_DIR", "/tmp/w1"),
            ("W1_POLL_INTERVAL_MS", "250"),
            ("W1_UNIT", "celsius"),
            ("W1_CHANNEL_CAPACITY", "8"),
        ]))
        .unwrap();

        assert_eq!(config.discovery.devices_dir, PathBuf::from("/tmp/w1"));
        assert_eq!(config.watch.interval(), Duration::from_millis(250));
        assert_eq!(config.watch.unit, Unit::Celsius);
        assert_eq!(config.watch.channel_capacity, 8);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("W1_POLL_INTERVAL_MS", "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "W1_POLL_INTERVAL_MS",
                value: "soon".to_string()
            }
        );

        assert!(Config::from_lookup(lookup_from(&[("W1_POLL_INTERVAL_MS", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("W1_UNIT", "rankine")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("W1_CHANNEL_CAPACITY", "0")])).is_err());
    }

    #[test]
    fn test_load_dotenv_reports_unreadable_file() {
        let dir = tempfile::TempDir::new().unwrap();

        // A missing file is skipped silently.
        assert!(load_dotenv_from(&dir.path().join(".env")).is_ok());

        // A directory in place of the file cannot be read.
        let env_dir = dir.path().join("unreadable.env");
        fs::create_dir(&env_dir).unwrap();
        assert!(load_dotenv_from(&env_dir).is_err());
    }

    #[test]
    fn test_parse_dotenv() {
        let content = "# comment\n\nW1_UNIT=celsius\nW1_DEVICES_DIR = \"/tmp/my dir\"\nBROKEN\n";
        assert_eq!(
            parse_dotenv(content),
            vec![("W1_UNIT", "celsius"), ("W1_DEVICES_DIR", "/tmp/my dir")]
        );
    }
}

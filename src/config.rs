//! Configuration file handling.
//!
//! ```toml
//! [polling]
//! scan_interval_secs = 5
//! conversion_delay_ms = 500
//!
//! [[sensor]]
//! bus = 1                # or "/dev/i2c-1"
//! address = 0x48
//! pin = "4@A0-GND"
//! name = "battery"       # optional
//! gain = "1@4.096"       # optional
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use common::physical::{Gain, GainError, Mux, MuxError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    internals::device::PollTiming,
    models::{
        device_key::{BusId, BusSetting, DeviceKey, DeviceKeyError},
        entity::{unique_id, SensorEntity},
    },
    DEFAULT_ADDRESS, DEFAULT_BUS, DEFAULT_CONVERSION_DELAY, DEFAULT_SCAN_INTERVAL,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}. Error: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config. Error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Sensor #{index}: {source}")]
    Key {
        index: usize,
        #[source]
        source: DeviceKeyError,
    },

    #[error("Sensor #{index}: unknown pin '{pin}'. Error: {source}")]
    Pin {
        index: usize,
        pin: String,
        #[source]
        source: MuxError,
    },

    #[error("Sensor #{index}: unknown gain '{gain}'. Error: {source}")]
    Gain {
        index: usize,
        gain: String,
        #[source]
        source: GainError,
    },

    #[error("Scan interval must be greater than zero.")]
    ZeroScanInterval,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default, rename = "sensor")]
    pub sensors: Vec<SensorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    #[serde(default = "default_conversion_delay_ms")]
    pub conversion_delay_ms: u64,
}

/// One configured pin, as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    #[serde(default = "default_bus")]
    pub bus: BusSetting,

    #[serde(default = "default_address")]
    pub address: u8,

    #[serde(default = "default_pin")]
    pub pin: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub gain: Option<String>,
}

/// A validated sensor: everything needed to build its entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryConfig {
    pub entry_id: String,
    pub key: DeviceKey,
    pub pin: Mux,
    pub gain: Gain,
    pub name: Option<String>,
}

fn default_scan_interval_secs() -> u64 {
    DEFAULT_SCAN_INTERVAL.as_secs()
}

fn default_conversion_delay_ms() -> u64 {
    DEFAULT_CONVERSION_DELAY.as_millis() as u64
}

fn default_bus() -> BusSetting {
    BusSetting::Number(DEFAULT_BUS)
}

fn default_address() -> u8 {
    DEFAULT_ADDRESS
}

fn default_pin() -> String {
    Mux::default().token().to_string()
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            conversion_delay_ms: default_conversion_delay_ms(),
        }
    }
}

impl PollingConfig {
    pub fn timing(&self) -> Result<PollTiming, ConfigError> {
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::ZeroScanInterval);
        }
        Ok(PollTiming {
            scan_interval: Duration::from_secs(self.scan_interval_secs),
            conversion_delay: Duration::from_millis(self.conversion_delay_ms),
        })
    }
}

impl SensorConfig {
    pub fn validate(&self, index: usize) -> Result<EntryConfig, ConfigError> {
        let bus = BusId::try_from(self.bus.clone())
            .map_err(|source| ConfigError::Key { index, source })?;
        let key = DeviceKey::new(bus, self.address)
            .map_err(|source| ConfigError::Key { index, source })?;
        let pin = self.pin.parse::<Mux>().map_err(|source| ConfigError::Pin {
            index,
            pin: self.pin.clone(),
            source,
        })?;
        let gain = match &self.gain {
            Some(gain) => gain.parse::<Gain>().map_err(|source| ConfigError::Gain {
                index,
                gain: gain.clone(),
                source,
            })?,
            None => Gain::default(),
        };
        let name = self
            .name
            .as_ref()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Ok(EntryConfig {
            entry_id: unique_id(&key, pin),
            key,
            pin,
            gain,
            name,
        })
    }
}

impl EntryConfig {
    pub fn entity(&self) -> SensorEntity {
        SensorEntity::new(
            self.entry_id.clone(),
            self.key,
            self.pin,
            self.gain,
            self.name.clone(),
        )
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}.", path.display());
        content.parse()
    }

    /// Validate every sensor. A later sensor with the same unique id
    /// replaces an earlier one. Entries come back ordered by id.
    pub fn entries(&self) -> Result<Vec<EntryConfig>, ConfigError> {
        let mut entries = BTreeMap::new();
        for (index, sensor) in self.sensors.iter().enumerate() {
            let entry = sensor.validate(index)?;
            if let Some(previous) = entries.insert(entry.entry_id.clone(), entry) {
                warn!(
                    "Sensor #{} replaces an earlier entry for '{}'.",
                    index, previous.entry_id
                );
            }
        }
        Ok(entries.into_values().collect())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const EXAMPLE: &str = r#"
        [polling]
        scan_interval_secs = 10

        [[sensor]]
        bus = 1
        address = 0x49
        pin = "2@A1-A3"
        name = "bridge"
        gain = "1@4.096"

        [[sensor]]
        bus = "/dev/i2c-0"
        pin = "7@A3-GND"
    "#;

    #[test]
    fn test_parse_example() {
        let config: Config = EXAMPLE.parse().unwrap();
        let timing = config.polling.timing().unwrap();
        assert_eq!(timing.scan_interval, Duration::from_secs(10));
        assert_eq!(timing.conversion_delay, Duration::from_millis(500));

        let entries = config.entries().unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].entry_id, "ads1115.0.72.7");
        assert_eq!(entries[0].key, DeviceKey::new(BusId(0), 0x48).unwrap());
        assert_eq!(entries[0].gain, Gain::FullScale6_144);
        assert_eq!(entries[0].name, None);

        assert_eq!(entries[1].entry_id, "ads1115.1.73.2");
        assert_eq!(entries[1].pin, Mux::A1A3);
        assert_eq!(entries[1].gain, Gain::FullScale4_096);
        assert_eq!(entries[1].name.as_deref(), Some("bridge"));
    }

    #[test]
    fn test_defaults() {
        let config: Config = "[[sensor]]".parse().unwrap();
        let timing = config.polling.timing().unwrap();
        assert_eq!(timing, PollTiming::default());

        let entries = config.entries().unwrap();
        assert_eq!(entries[0].key, DeviceKey::new(BusId(1), 0x48).unwrap());
        assert_eq!(entries[0].pin, Mux::A0A1);
        assert_eq!(entries[0].entity().name(), "bus 1 pin 0x48:0");
    }

    #[test]
    fn test_empty_config() {
        let config: Config = "".parse().unwrap();
        assert!(config.entries().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_entries_keep_the_last() {
        let config: Config = r#"
            [[sensor]]
            pin = "4@A0-GND"
            name = "first"

            [[sensor]]
            pin = "4@A0-GND"
            name = "second"
        "#
        .parse()
        .unwrap();

        let entries = config.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name.as_deref(), Some("second"));
    }

    #[test]
    fn test_invalid_sensors() {
        let config: Config = "[[sensor]]\naddress = 0x50".parse().unwrap();
        assert!(matches!(
            config.entries(),
            Err(ConfigError::Key {
                index: 0,
                source: DeviceKeyError::AddressOutOfRange(0x50)
            })
        ));

        let config: Config = "[[sensor]]\npin = \"9@A9\"".parse().unwrap();
        let err = config.entries().unwrap_err();
        assert!(matches!(err, ConfigError::Pin { .. }));
        assert!(std::error::Error::source(&err).is_some());

        let config: Config = "[[sensor]]\ngain = \"2@4.096\"".parse().unwrap();
        let err = config.entries().unwrap_err();
        assert!(matches!(err, ConfigError::Gain { .. }));
        assert!(std::error::Error::source(&err).is_some());

        let config: Config = "[[sensor]]\nbus = \"/dev/ttyACM0\"".parse().unwrap();
        assert!(matches!(config.entries(), Err(ConfigError::Key { .. })));
    }

    #[test]
    fn test_blank_name_uses_default() {
        let config: Config = "[[sensor]]\nname = \"  \"".parse().unwrap();
        assert_eq!(config.entries().unwrap()[0].name, None);
    }

    #[test]
    fn test_rejects_unknown_fields_and_zero_interval() {
        assert!("[[sensor]]\nchannel = 1".parse::<Config>().is_err());

        let config: Config = "[polling]\nscan_interval_secs = 0".parse().unwrap();
        assert!(matches!(
            config.polling.timing(),
            Err(ConfigError::ZeroScanInterval)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sensors.len(), 2);

        assert!(matches!(
            Config::load(Path::new("/nonexistent/ads1115.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}

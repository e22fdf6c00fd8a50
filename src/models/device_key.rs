use std::{fmt::Display, path::PathBuf, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::{ADDRESS_RANGE, DOMAIN};

/// Number of a Linux I2C adapter, `/dev/i2c-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub u8);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeviceKeyError {
    #[error("Invalid i2c bus '{0}'.")]
    InvalidBus(String),

    #[error("Address 0x{0:02x} is outside of 0x48..=0x4b.")]
    AddressOutOfRange(u8),
}

impl BusId {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/i2c-{}", self.0))
    }
}

impl FromStr for BusId {
    type Err = DeviceKeyError;

    /// Accepts a bare bus number or a device file path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_prefix("/dev/i2c-")
            .or_else(|| trimmed.strip_prefix("i2c-"))
            .unwrap_or(trimmed);
        number
            .parse::<u8>()
            .map(BusId)
            .map_err(|_| DeviceKeyError::InvalidBus(s.to_string()))
    }
}

impl Display for BusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bus settings may be written as `1` or `"/dev/i2c-1"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BusSetting {
    Number(u8),
    Path(String),
}

impl TryFrom<BusSetting> for BusId {
    type Error = DeviceKeyError;

    fn try_from(value: BusSetting) -> Result<Self, Self::Error> {
        match value {
            BusSetting::Number(number) => Ok(BusId(number)),
            BusSetting::Path(path) => path.parse(),
        }
    }
}

/// Identifies one physical chip: at most one device exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub bus: BusId,
    pub address: u8,
}

impl DeviceKey {
    pub fn new(bus: BusId, address: u8) -> Result<Self, DeviceKeyError> {
        if !ADDRESS_RANGE.contains(&address) {
            return Err(DeviceKeyError::AddressOutOfRange(address));
        }
        Ok(Self { bus, address })
    }

    /// Numeric identifier used by the device catalog.
    pub fn identifier(&self) -> u32 {
        self.bus.0 as u32 * 1000 + self.address as u32
    }

    /// Human readable name recorded in the device catalog.
    pub fn name(&self) -> String {
        format!("{}[{}]@0x{:02x}", DOMAIN, self.bus, self.address)
    }

    pub fn unique_id(&self) -> String {
        format!("{}[{}]0x{:02x}", DOMAIN, self.bus, self.address)
    }
}

impl Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unique_id())
    }
}

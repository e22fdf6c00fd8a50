//! Polled voltage sensors backed by ADS1115 converters on Linux I2C buses.
//!
//! Each chip is a [`internals::device::Device`] owning one polling thread.
//! Configured pins are [`models::entity::SensorEntity`] values attached to the
//! device for their (bus, address) through the [`internals::registry::DeviceRegistry`].

use std::{ops::RangeInclusive, time::Duration};

pub mod config;
pub mod externals;
pub mod internals;
pub mod models;
pub mod system;

pub const DOMAIN: &str = "ads1115";
pub const DEVICE_MANUFACTURER: &str = "Texas Instruments";

/// Addresses selectable through the ADDR pin.
pub const ADDRESS_RANGE: RangeInclusive<u8> = 0x48..=0x4B;
pub const DEFAULT_ADDRESS: u8 = 0x48;
pub const DEFAULT_BUS: u8 = 1;

/// Buses never probed during discovery.
pub const SKIP_I2C_BUSES: [u8; 2] = [0, 2];

/// One slot per multiplexer mode.
pub const SLOT_COUNT: usize = 8;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_CONVERSION_DELAY: Duration = Duration::from_millis(500);

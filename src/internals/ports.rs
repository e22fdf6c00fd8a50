use std::fmt::Debug;

use embedded_hal::blocking::i2c::{Write, WriteRead};
use thiserror::Error;

use crate::models::{
    device_info::{DeviceInfo, Notification},
    device_key::BusId,
};

/// Common error type for bus operations.
#[derive(Error, Debug)]
pub enum HwError {
    #[error("Failed to open i2c bus {bus}. Error: {reason}")]
    Open { bus: BusId, reason: String },

    #[error("I2C transaction with 0x{address:02x} failed. Error: {reason}")]
    Transaction { address: u8, reason: String },
}

/// Blocking access to one I2C bus. Every call addresses a single chip.
pub trait I2cBus: Send {
    /// Write `bytes` to the chip at `address`.
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), HwError>;

    /// Write `bytes` then read back into `buffer` (repeated start).
    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8])
        -> Result<(), HwError>;
}

impl<T> I2cBus for T
where
    T: Write + WriteRead + Send,
    <T as Write>::Error: Debug,
    <T as WriteRead>::Error: Debug,
{
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), HwError> {
        Write::write(self, address, bytes).map_err(|e| HwError::Transaction {
            address,
            reason: format!("{:?}", e),
        })
    }

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), HwError> {
        WriteRead::write_read(self, address, bytes, buffer).map_err(|e| HwError::Transaction {
            address,
            reason: format!("{:?}", e),
        })
    }
}

/// Opens bus handles. Each device gets its own handle.
pub trait I2cBusPort: Send + Sync {
    fn open(&self, bus: BusId) -> Result<Box<dyn I2cBus>, HwError>;
}

/// The host's catalog of physical devices.
pub trait DeviceCatalogPort: Send + Sync {
    fn register_device(&self, info: DeviceInfo);
}

/// The host's user visible notifications.
pub trait NotificationPort: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// The host's store of configuration entries.
pub trait ConfigEntryPort: Send + Sync {
    fn remove_entry(&self, entry_id: &str);
}

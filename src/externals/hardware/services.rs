use linux_embedded_hal::I2cdev;
use tracing::{debug, instrument};

use crate::{
    internals::ports::{HwError, I2cBus, I2cBusPort},
    models::device_key::BusId,
};

/// Opens `/dev/i2c-<n>` character devices through `linux-embedded-hal`.
/// The slave address is set per transaction by the embedded-hal impls.
pub struct LinuxI2cBusService;

impl I2cBusPort for LinuxI2cBusService {
    #[instrument(skip(self))]
    fn open(&self, bus: BusId) -> Result<Box<dyn I2cBus>, HwError> {
        let path = bus.path();
        let device = I2cdev::new(&path).map_err(|e| HwError::Open {
            bus,
            reason: format!("{:?}", e),
        })?;
        debug!("Opened {}.", path.display());
        Ok(Box::new(device))
    }
}

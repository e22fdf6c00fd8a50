use std::sync::Arc;

use self::services::LinuxI2cBusService;

pub mod services;

pub struct HardwareModule {
    pub bus_port: Arc<LinuxI2cBusService>,
}

impl HardwareModule {
    pub fn initialize() -> Self {
        Self {
            bus_port: Arc::new(LinuxI2cBusService),
        }
    }
}

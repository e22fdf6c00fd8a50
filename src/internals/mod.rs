pub mod device;
pub mod ports;
pub mod registry;

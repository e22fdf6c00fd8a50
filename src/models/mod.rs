pub mod device_info;
pub mod device_key;
pub mod entity;

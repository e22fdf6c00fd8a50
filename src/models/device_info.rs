use std::fmt::Display;

use super::device_key::DeviceKey;
use crate::{DEVICE_MANUFACTURER, DOMAIN};

/// Metadata recorded in the host's device catalog when a chip is first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Config entry which caused the device to be created.
    pub config_entry_id: String,
    pub identifiers: Vec<(String, u32)>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
}

impl DeviceInfo {
    pub fn new(config_entry_id: &str, key: &DeviceKey) -> Self {
        Self {
            config_entry_id: config_entry_id.to_string(),
            identifiers: vec![(DOMAIN.to_string(), key.identifier())],
            name: key.name(),
            model: DOMAIN.to_string(),
            manufacturer: DEVICE_MANUFACTURER.to_string(),
        }
    }
}

impl Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Device {} | {} {}>", self.name, self.manufacturer, self.model)
    }
}

/// User visible message raised by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub notification_id: String,
    pub title: String,
    pub message: String,
}

impl Notification {
    /// Raised when the chip behind a config entry can't be reached.
    pub fn unreachable_device(key: &DeviceKey, error: &dyn Display) -> Self {
        Self {
            notification_id: format!("{} notification", DOMAIN),
            title: format!("{} Configuration", DOMAIN),
            message: format!(
                "Error: Unable to access {}[{}]0x{:02x} ({})",
                DOMAIN, key.bus, key.address, error
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device_key::BusId;

    #[test]
    fn test_device_info() {
        let key = DeviceKey::new(BusId(0), 0x4A).expect("Failed to build key.");
        let info = DeviceInfo::new("entry", &key);
        assert_eq!(info.identifiers, vec![("ads1115".to_string(), 74)]);
        assert_eq!(info.name, "ads1115[0]@0x4a");
        assert_eq!(info.model, "ads1115");
        assert_eq!(info.manufacturer, "Texas Instruments");
    }

    #[test]
    fn test_unreachable_notification() {
        let key = DeviceKey::new(BusId(1), 0x48).expect("Failed to build key.");
        let notification = Notification::unreachable_device(&key, &"no ack");
        assert_eq!(notification.title, "ads1115 Configuration");
        assert_eq!(notification.notification_id, "ads1115 notification");
        assert_eq!(
            notification.message,
            "Error: Unable to access ads1115[1]0x48 (no ack)"
        );
    }
}

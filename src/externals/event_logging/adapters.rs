use std::sync::Mutex;

use tracing::{error, info, warn};

use crate::{
    internals::ports::{ConfigEntryPort, DeviceCatalogPort, NotificationPort},
    models::device_info::{DeviceInfo, Notification},
};

/// Host side of the ports for the standalone daemon: everything the host
/// would show to a user is emitted as a log event instead.
#[derive(Default)]
pub struct EmitToLoggingAdapter {
    devices: Mutex<Vec<DeviceInfo>>,
    removed_entries: Mutex<Vec<String>>,
}

impl EmitToLoggingAdapter {
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.devices.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn removed_entries(&self) -> Vec<String> {
        self.removed_entries
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl DeviceCatalogPort for EmitToLoggingAdapter {
    fn register_device(&self, info: DeviceInfo) {
        info!(
            identifiers = ?info.identifiers,
            "[DEVICE CATALOG] Registered {}",
            info
        );
        if let Ok(mut devices) = self.devices.lock() {
            devices.push(info);
        }
    }
}

impl NotificationPort for EmitToLoggingAdapter {
    fn notify(&self, notification: Notification) {
        error!(
            id = %notification.notification_id,
            "[NOTIFICATION] {}: {}",
            notification.title,
            notification.message
        );
    }
}

impl ConfigEntryPort for EmitToLoggingAdapter {
    fn remove_entry(&self, entry_id: &str) {
        warn!("[CONFIG] Removing entry '{}'.", entry_id);
        if let Ok(mut removed) = self.removed_entries.lock() {
            removed.push(entry_id.to_string());
        }
    }
}

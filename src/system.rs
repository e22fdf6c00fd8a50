use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::{
    config::EntryConfig,
    internals::{
        ports::{ConfigEntryPort, NotificationPort},
        registry::{DeviceRegistry, RegistryError},
    },
    models::{device_info::Notification, entity::SensorEntity},
};

/// Host process lifecycle events the registry reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Started,
    Stopping,
}

/// Build the entity for `entry` and attach it to its device.
///
/// When the chip can't be reached the entry is removed from the host and
/// the user is notified. No entity is returned in that case.
#[instrument(skip_all, fields(entry = %entry.entry_id))]
pub fn setup_entry(
    registry: &DeviceRegistry,
    entry: &EntryConfig,
    config_entries: &dyn ConfigEntryPort,
    notifications: &dyn NotificationPort,
) -> Option<Arc<SensorEntity>> {
    debug!("Setting up entry.");
    let entity = Arc::new(entry.entity());

    match registry.get_or_create(entity.clone()) {
        Ok(device) => {
            info!("{} ready on {}.", entity.title(), device.unique_id());
            Some(entity)
        }
        Err(e) => {
            error!("Failed to set up entry. Error: {}", e);
            config_entries.remove_entry(&entry.entry_id);
            let notification = match &e {
                RegistryError::Create { source, .. } => {
                    Notification::unreachable_device(&entry.key, source)
                }
                other => Notification::unreachable_device(&entry.key, other),
            };
            notifications.notify(notification);
            None
        }
    }
}

/// Set up every entry, keeping the entities that made it.
pub fn setup_entries(
    registry: &DeviceRegistry,
    entries: &[EntryConfig],
    config_entries: &dyn ConfigEntryPort,
    notifications: &dyn NotificationPort,
) -> Vec<Arc<SensorEntity>> {
    entries
        .iter()
        .filter_map(|entry| setup_entry(registry, entry, config_entries, notifications))
        .collect()
}

/// Start or stop every device's polling thread.
pub fn handle_host_event(registry: &DeviceRegistry, event: HostEvent) {
    info!("Host event: {:?}", event);
    let result = match event {
        HostEvent::Started => registry.start_all(),
        HostEvent::Stopping => registry.stop_all(),
    };
    if let Err(e) = result {
        error!("Failed to handle host event {:?}. Error: {}", event, e);
    }
}

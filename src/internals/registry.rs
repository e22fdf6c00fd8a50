use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{
    device::{Device, DeviceError, PollTiming},
    ports::{DeviceCatalogPort, I2cBusPort},
};
use crate::models::{device_info::DeviceInfo, device_key::DeviceKey, entity::SensorEntity};

static GLOBAL_REGISTRY: OnceCell<DeviceRegistry> = OnceCell::new();

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unable to create device {key}. Error: {source}")]
    Create {
        key: DeviceKey,
        #[source]
        source: DeviceError,
    },

    #[error("Failed to attach entity to {key}. Error: {source}")]
    Register {
        key: DeviceKey,
        #[source]
        source: DeviceError,
    },

    #[error("Device registry already initialized.")]
    AlreadyInitialized,

    #[error("Device registry lock poisoned.")]
    LockPoisoned,
}

/// Table of every chip in the process, keyed by (bus, address).
pub struct DeviceRegistry {
    bus_port: Arc<dyn I2cBusPort>,
    catalog: Arc<dyn DeviceCatalogPort>,
    timing: PollTiming,
    devices: Mutex<HashMap<DeviceKey, Arc<Device>>>,
    host_running: AtomicBool,
}

impl DeviceRegistry {
    pub fn new(
        bus_port: Arc<dyn I2cBusPort>,
        catalog: Arc<dyn DeviceCatalogPort>,
        timing: PollTiming,
    ) -> Self {
        Self {
            bus_port,
            catalog,
            timing,
            devices: Mutex::new(HashMap::new()),
            host_running: AtomicBool::new(false),
        }
    }

    /// Install the process wide registry. Can only happen once.
    pub fn init_global(
        bus_port: Arc<dyn I2cBusPort>,
        catalog: Arc<dyn DeviceCatalogPort>,
        timing: PollTiming,
    ) -> Result<&'static DeviceRegistry, RegistryError> {
        let mut created = false;
        let registry = GLOBAL_REGISTRY.get_or_init(|| {
            created = true;
            DeviceRegistry::new(bus_port, catalog, timing)
        });
        if !created {
            return Err(RegistryError::AlreadyInitialized);
        }
        Ok(registry)
    }

    pub fn global() -> Option<&'static DeviceRegistry> {
        GLOBAL_REGISTRY.get()
    }

    fn lock_devices(&self) -> Result<MutexGuard<'_, HashMap<DeviceKey, Arc<Device>>>, RegistryError> {
        self.devices.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    /// Return the device for the entity's (bus, address), creating it on
    /// first use, and attach the entity to it.
    ///
    /// A newly created device starts polling right away when the host is
    /// already running, and is recorded in the device catalog.
    pub fn get_or_create(&self, entity: Arc<SensorEntity>) -> Result<Arc<Device>, RegistryError> {
        let key = entity.key();
        let mut devices = self.lock_devices()?;

        let device = match devices.get(&key) {
            Some(device) => {
                debug!("Reusing device {}.", key);
                device.clone()
            }
            None => {
                let device = Device::open(key, self.bus_port.as_ref(), self.timing)
                    .map(Arc::new)
                    .map_err(|source| RegistryError::Create { key, source })?;
                devices.insert(key, device.clone());

                if self.host_running.load(Ordering::SeqCst) {
                    if let Err(e) = device.start_polling() {
                        error!("Failed to start polling {}. Error: {}", key, e);
                    }
                }

                self.catalog
                    .register_device(DeviceInfo::new(entity.entry_id(), &key));
                device
            }
        };

        device
            .register_entity(entity)
            .map_err(|source| RegistryError::Register { key, source })?;
        Ok(device)
    }

    pub fn get(&self, key: &DeviceKey) -> Option<Arc<Device>> {
        self.devices.lock().ok()?.get(key).cloned()
    }

    /// Every device, ordered by key.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        let Ok(devices) = self.devices.lock() else {
            return vec![];
        };
        let mut devices: Vec<_> = devices.values().cloned().collect();
        devices.sort_by_key(|device| device.key());
        devices
    }

    pub fn is_host_running(&self) -> bool {
        self.host_running.load(Ordering::SeqCst)
    }

    /// Host started: begin polling every device that isn't already.
    pub fn start_all(&self) -> Result<(), RegistryError> {
        let devices = self.lock_devices()?;
        self.host_running.store(true, Ordering::SeqCst);
        info!("Starting polling for {} devices.", devices.len());
        for device in devices.values() {
            if device.is_alive() {
                continue;
            }
            if let Err(e) = device.start_polling() {
                warn!("Failed to start polling {}. Error: {}", device.key(), e);
            }
        }
        Ok(())
    }

    /// Host stopping: stop and join every polling thread.
    pub fn stop_all(&self) -> Result<(), RegistryError> {
        let devices = self.lock_devices()?;
        self.host_running.store(false, Ordering::SeqCst);
        info!("Stopping polling for {} devices.", devices.len());
        for device in devices.values() {
            if let Err(e) = device.stop_polling() {
                error!("Failed to stop polling {}. Error: {}", device.key(), e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        sync::{atomic::AtomicUsize, Barrier},
        thread,
    };

    use common::physical::{Gain, Mux};

    use super::*;
    use crate::{
        internals::{
            device::tests::{fast_timing, MockBus},
            ports::{HwError, I2cBus},
        },
        models::device_key::BusId,
    };

    /// Opens mock buses and counts how often it was asked to.
    #[derive(Default)]
    pub struct MockBusPort {
        pub opened: AtomicUsize,
        pub unreachable: bool,
    }

    impl I2cBusPort for MockBusPort {
        fn open(&self, bus: BusId) -> Result<Box<dyn I2cBus>, HwError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                return Err(HwError::Open {
                    bus,
                    reason: "No such file or directory".into(),
                });
            }
            let (bus, _log) = MockBus::new();
            Ok(Box::new(bus))
        }
    }

    #[derive(Default)]
    pub struct MockCatalog {
        pub devices: Mutex<Vec<DeviceInfo>>,
    }

    impl DeviceCatalogPort for MockCatalog {
        fn register_device(&self, info: DeviceInfo) {
            self.devices.lock().unwrap().push(info);
        }
    }

    fn registry(unreachable: bool) -> (DeviceRegistry, Arc<MockBusPort>, Arc<MockCatalog>) {
        let port = Arc::new(MockBusPort {
            unreachable,
            ..Default::default()
        });
        let catalog = Arc::new(MockCatalog::default());
        (
            DeviceRegistry::new(port.clone(), catalog.clone(), fast_timing()),
            port,
            catalog,
        )
    }

    fn entity(address: u8, pin: Mux) -> Arc<SensorEntity> {
        let key = DeviceKey::new(BusId(1), address).unwrap();
        Arc::new(SensorEntity::new(
            format!("entry-{}", pin.code()),
            key,
            pin,
            Gain::default(),
            None,
        ))
    }

    #[test]
    fn test_same_key_shares_device() {
        let (registry, port, catalog) = registry(false);
        let first = registry.get_or_create(entity(0x48, Mux::A0Gnd)).unwrap();
        let second = registry.get_or_create(entity(0x48, Mux::A1Gnd)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(port.opened.load(Ordering::SeqCst), 1);
        let key = DeviceKey::new(BusId(1), 0x48).unwrap();
        assert!(Arc::ptr_eq(&registry.get(&key).unwrap(), &first));
        assert!(registry.get(&DeviceKey::new(BusId(2), 0x48).unwrap()).is_none());
        assert_eq!(first.entities().unwrap().len(), 2);

        let catalog = catalog.devices.lock().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "ads1115[1]@0x48");
        assert_eq!(catalog[0].config_entry_id, "entry-4");
    }

    #[test]
    fn test_distinct_addresses_get_distinct_devices() {
        let (registry, port, _catalog) = registry(false);
        let first = registry.get_or_create(entity(0x48, Mux::A0Gnd)).unwrap();
        let second = registry.get_or_create(entity(0x49, Mux::A0Gnd)).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(port.opened.load(Ordering::SeqCst), 2);
        let keys: Vec<_> = registry.devices().iter().map(|d| d.key().address).collect();
        assert_eq!(keys, vec![0x48, 0x49]);
    }

    #[test]
    fn test_concurrent_get_or_create_builds_one_device() {
        const THREADS: usize = 16;
        let (registry, port, catalog) = registry(false);
        let registry = Arc::new(registry);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let pin = Mux::from_code((i % 8) as u8).unwrap();
                    barrier.wait();
                    registry.get_or_create(entity(0x4A, pin)).unwrap()
                })
            })
            .collect();
        let devices: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(port.opened.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.devices.lock().unwrap().len(), 1);
        assert!(devices.iter().all(|d| Arc::ptr_eq(d, &devices[0])));
        assert_eq!(registry.devices().len(), 1);
    }

    #[test]
    fn test_unreachable_device_is_not_registered() {
        let (registry, _port, catalog) = registry(true);
        let result = registry.get_or_create(entity(0x48, Mux::A0Gnd));

        assert!(matches!(result, Err(RegistryError::Create { .. })));
        assert!(registry.devices().is_empty());
        assert!(catalog.devices.lock().unwrap().is_empty());
    }

    #[test]
    fn test_devices_created_while_running_start_polling() {
        let (registry, _port, _catalog) = registry(false);
        let before = registry.get_or_create(entity(0x48, Mux::A0Gnd)).unwrap();
        assert!(!before.is_alive());

        registry.start_all().unwrap();
        assert!(registry.is_host_running());
        assert!(before.is_alive());

        let after = registry.get_or_create(entity(0x49, Mux::A0Gnd)).unwrap();
        assert!(after.is_alive());

        registry.stop_all().unwrap();
        assert!(!before.is_alive());
        assert!(!after.is_alive());
        assert!(!registry.is_host_running());
    }

    #[test]
    fn test_global_registry_initializes_once() {
        let port = Arc::new(MockBusPort::default());
        let catalog = Arc::new(MockCatalog::default());

        let registry = DeviceRegistry::init_global(port.clone(), catalog.clone(), fast_timing())
            .unwrap();
        assert!(std::ptr::eq(registry, DeviceRegistry::global().unwrap()));
        assert!(matches!(
            DeviceRegistry::init_global(port, catalog, fast_timing()),
            Err(RegistryError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_start_all_is_idempotent() {
        let (registry, _port, _catalog) = registry(false);
        let device = registry.get_or_create(entity(0x4B, Mux::A3Gnd)).unwrap();
        registry.start_all().unwrap();
        registry.start_all().unwrap();
        assert!(device.is_alive());
        registry.stop_all().unwrap();
        assert!(!device.is_alive());
    }
}

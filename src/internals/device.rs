use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use common::{
    physical::Voltage,
    register::{raw_from_bytes, raw_to_voltage, REGISTER_CONFIG, REGISTER_CONVERSION},
};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use super::ports::{HwError, I2cBus, I2cBusPort};
use crate::{
    models::{device_key::DeviceKey, entity::SensorEntity},
    DEFAULT_CONVERSION_DELAY, DEFAULT_SCAN_INTERVAL, SLOT_COUNT,
};

/// Timing of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Pause between the end of one cycle and the start of the next.
    pub scan_interval: Duration,
    /// Pause between starting a conversion and reading it back.
    pub conversion_delay: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            conversion_delay: DEFAULT_CONVERSION_DELAY,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Chip not reachable. Error: {0}")]
    Unreachable(#[from] HwError),

    #[error("Polling already started for {0}.")]
    AlreadyStarted(String),

    #[error("Polling for {0} was stopped and can't be restarted.")]
    Stopped(String),

    #[error("Failed to spawn polling thread. Error: {0}")]
    Spawn(std::io::Error),

    #[error("Polling thread for {0} panicked.")]
    PollingPanicked(String),

    #[error("Device lock poisoned.")]
    LockPoisoned,
}

/// Everything the polling thread and the registration path share. Only
/// touched while holding the device lock.
struct DeviceState {
    bus: Box<dyn I2cBus>,
    slots: [Option<Arc<SensorEntity>>; SLOT_COUNT],
}

enum Lifecycle {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// One ADS1115 chip. Owns the bus handle and the slot array, the polling
/// thread itself lives in [`polling_loop`].
pub struct Device {
    key: DeviceKey,
    timing: PollTiming,
    run: AtomicBool,
    state: Mutex<DeviceState>,
    lifecycle: Mutex<Lifecycle>,
}

impl Device {
    /// Wrap an already opened bus handle. No traffic is generated.
    pub fn new(key: DeviceKey, bus: Box<dyn I2cBus>, timing: PollTiming) -> Self {
        info!("{} device created", key);
        Self {
            key,
            timing,
            run: AtomicBool::new(false),
            state: Mutex::new(DeviceState {
                bus,
                slots: Default::default(),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Open the bus for `key` and make sure the chip answers.
    pub fn open(
        key: DeviceKey,
        bus_port: &dyn I2cBusPort,
        timing: PollTiming,
    ) -> Result<Self, DeviceError> {
        let mut bus = bus_port.open(key.bus)?;
        probe(bus.as_mut(), key.address)?;
        Ok(Self::new(key, bus, timing))
    }

    pub fn key(&self) -> DeviceKey {
        self.key
    }

    pub fn unique_id(&self) -> String {
        self.key.unique_id()
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, DeviceState>, DeviceError> {
        self.state.lock().map_err(|_| DeviceError::LockPoisoned)
    }

    /// Attach `entity` to the slot of its pin. An entity already in that
    /// slot is replaced and returned.
    pub fn register_entity(
        &self,
        entity: Arc<SensorEntity>,
    ) -> Result<Option<Arc<SensorEntity>>, DeviceError> {
        let mut state = self.lock_state()?;
        let slot = entity.slot();
        info!(
            "SensorEntity(pin {}:'{}') attached to {}",
            slot,
            entity.name(),
            self.key
        );
        let previous = state.slots[slot].replace(entity);
        if let Some(previous) = &previous {
            warn!(
                "Replaced '{}' on pin {} of {}.",
                previous.name(),
                slot,
                self.key
            );
        }
        Ok(previous)
    }

    /// Entities currently attached, in slot order.
    pub fn entities(&self) -> Result<Vec<Arc<SensorEntity>>, DeviceError> {
        let state = self.lock_state()?;
        Ok(state.slots.iter().flatten().cloned().collect())
    }

    /// Run one read/convert/publish cycle over every occupied slot.
    pub fn poll_once(&self) -> Result<(), DeviceError> {
        let mut state = self.lock_state()?;
        trace!("heartbeat: {}", self.key);
        let DeviceState { bus, slots } = &mut *state;
        for entity in slots.iter().flatten() {
            match read_voltage(bus.as_mut(), self.key.address, entity, self.timing) {
                Ok(voltage) => {
                    debug!("{} = {}", entity.unique_id(), voltage);
                    entity.set_state(voltage);
                }
                Err(e) => error!(
                    "Failed to read pin {} of {}. Error: {}",
                    entity.slot(),
                    self.key,
                    e
                ),
            }
        }
        Ok(())
    }

    /// Spawn the polling thread. A device polls at most once in its life.
    pub fn start_polling(self: &Arc<Self>) -> Result<(), DeviceError> {
        let mut lifecycle = self.lifecycle.lock().map_err(|_| DeviceError::LockPoisoned)?;
        match *lifecycle {
            Lifecycle::Running(_) => return Err(DeviceError::AlreadyStarted(self.unique_id())),
            Lifecycle::Stopped => return Err(DeviceError::Stopped(self.unique_id())),
            Lifecycle::Idle => {}
        }

        self.run.store(true, Ordering::SeqCst);
        let device = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(self.unique_id())
            .spawn(move || polling_loop(device))
            .map_err(|e| {
                self.run.store(false, Ordering::SeqCst);
                DeviceError::Spawn(e)
            })?;
        *lifecycle = Lifecycle::Running(handle);
        Ok(())
    }

    /// Ask the polling thread to exit and wait for it. Returns once the
    /// thread is gone.
    pub fn stop_polling(&self) -> Result<(), DeviceError> {
        let mut lifecycle = self.lifecycle.lock().map_err(|_| DeviceError::LockPoisoned)?;
        self.run.store(false, Ordering::SeqCst);
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(handle) => {
                handle.thread().unpark();
                handle
                    .join()
                    .map_err(|_| DeviceError::PollingPanicked(self.unique_id()))
            }
            Lifecycle::Idle | Lifecycle::Stopped => Ok(()),
        }
    }

    /// True while the polling thread is running.
    pub fn is_alive(&self) -> bool {
        match self.lifecycle.lock() {
            Ok(lifecycle) => match &*lifecycle {
                Lifecycle::Running(handle) => !handle.is_finished(),
                Lifecycle::Idle | Lifecycle::Stopped => false,
            },
            Err(_) => false,
        }
    }

    /// True once polling has been stopped.
    pub fn is_stopped(&self) -> bool {
        match self.lifecycle.lock() {
            Ok(lifecycle) => matches!(*lifecycle, Lifecycle::Stopped),
            Err(_) => false,
        }
    }

    fn is_running(&self) -> bool {
        self.run.load(Ordering::SeqCst)
    }

    /// Sleep until the next cycle is due or polling is stopped.
    fn wait_for_next_cycle(&self) {
        let deadline = Instant::now() + self.timing.scan_interval;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

/// Body of a device's polling thread. Runs until the run flag is cleared.
pub fn polling_loop(device: Arc<Device>) {
    info!("{} start polling thread", device.key);
    while device.is_running() {
        if let Err(e) = device.poll_once() {
            error!("Polling {} failed. Error: {}", device.key, e);
            break;
        }
        device.wait_for_next_cycle();
    }
    info!("{} stop polling thread", device.key);
}

/// Start a conversion for `entity`, wait for it and read it back.
fn read_voltage(
    bus: &mut dyn I2cBus,
    address: u8,
    entity: &SensorEntity,
    timing: PollTiming,
) -> Result<Voltage, HwError> {
    let [high, low] = entity.read_request();
    bus.write(address, &[REGISTER_CONFIG, high, low])?;
    thread::sleep(timing.conversion_delay);

    let mut buffer = [0u8; 2];
    bus.write_read(address, &[REGISTER_CONVERSION], &mut buffer)?;
    let raw = raw_from_bytes(buffer);
    trace!("{} raw conversion 0x{:04x}", entity.unique_id(), raw);
    Ok(raw_to_voltage(raw, entity.gain()))
}

/// Read the config register of the chip at `address`. A chip that answers
/// is present.
pub fn probe(bus: &mut dyn I2cBus, address: u8) -> Result<(), HwError> {
    let mut buffer = [0u8; 2];
    bus.write_read(address, &[REGISTER_CONFIG], &mut buffer)?;
    debug!(
        "Chip at 0x{:02x} answered with config 0x{:04x}.",
        address,
        raw_from_bytes(buffer)
    );
    Ok(())
}

use common::{
    physical::{Gain, Mux, Voltage},
    register::read_request,
};
use serde::Serialize;
use tokio::sync::watch;

use super::device_key::DeviceKey;
use crate::DOMAIN;

/// One configured input of a chip. The owning device is the only writer of
/// its state, everyone else reads or subscribes.
#[derive(Debug)]
pub struct SensorEntity {
    entry_id: String,
    key: DeviceKey,
    name: String,
    pin: Mux,
    gain: Gain,
    read_request: [u8; 2],
    state: watch::Sender<Option<Voltage>>,
}

/// Snapshot of what the host exposes for a sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAttributes {
    pub unique_id: String,
    pub name: String,
    pub state: Option<f32>,
    pub unit_of_measurement: &'static str,
    pub device_class: &'static str,
    pub state_class: &'static str,
    pub should_poll: bool,
    pub icon: &'static str,
}

impl SensorEntity {
    pub fn new(
        entry_id: impl Into<String>,
        key: DeviceKey,
        pin: Mux,
        gain: Gain,
        name: Option<String>,
    ) -> Self {
        let name = name.unwrap_or_else(|| default_name(&key, pin));
        let (state, _) = watch::channel(None);
        Self {
            entry_id: entry_id.into(),
            key,
            name,
            pin,
            gain,
            read_request: read_request(pin, gain),
            state,
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn key(&self) -> DeviceKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Index of this entity in its device's slot array.
    pub fn slot(&self) -> usize {
        self.pin.code() as usize
    }

    /// Config register bytes which start a conversion for this pin.
    pub fn read_request(&self) -> [u8; 2] {
        self.read_request
    }

    pub fn unique_id(&self) -> String {
        unique_id(&self.key, self.pin)
    }

    pub fn title(&self) -> String {
        format!(
            "[{}]0x{:02x}:pin {} ('{}')",
            self.key.bus,
            self.key.address,
            self.pin.code(),
            self.name
        )
    }

    /// Last observed voltage, `None` until the first successful reading.
    pub fn state(&self) -> Option<Voltage> {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, voltage: Voltage) {
        self.state.send_replace(Some(voltage));
    }

    /// Receiver notified on every reading.
    pub fn subscribe(&self) -> watch::Receiver<Option<Voltage>> {
        self.state.subscribe()
    }

    pub fn attributes(&self) -> SensorAttributes {
        SensorAttributes {
            unique_id: self.unique_id(),
            name: self.name.clone(),
            state: self.state().map(|voltage| voltage.value()),
            unit_of_measurement: "V",
            device_class: "voltage",
            state_class: "measurement",
            should_poll: true,
            icon: "mdi:sine-wave",
        }
    }
}

/// Identifier of the config entry (and sensor) for one pin of one chip.
pub fn unique_id(key: &DeviceKey, pin: Mux) -> String {
    format!(
        "{}.{}.{}.{}",
        DOMAIN,
        key.bus,
        key.address,
        pin.code()
    )
}

fn default_name(key: &DeviceKey, pin: Mux) -> String {
    format!("bus {} pin 0x{:02x}:{}", key.bus, key.address, pin.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device_key::BusId;
    use common::register::raw_to_voltage;

    fn entity(pin: Mux, gain: Gain, name: Option<String>) -> SensorEntity {
        let key = DeviceKey::new(BusId(1), 0x48).expect("Failed to build key.");
        SensorEntity::new("entry", key, pin, gain, name)
    }

    #[test]
    fn test_read_request_is_precomputed() {
        let entity = entity(Mux::A1A3, Gain::FullScale6_144, None);
        assert_eq!(entity.read_request(), [0xA0, 0x83]);
        assert_eq!(entity.slot(), 2);
    }

    #[test]
    fn test_identity() {
        let sensor = entity(Mux::A0Gnd, Gain::FullScale4_096, None);
        assert_eq!(sensor.unique_id(), "ads1115.1.72.4");
        assert_eq!(sensor.name(), "bus 1 pin 0x48:4");
        assert_eq!(sensor.title(), "[1]0x48:pin 4 ('bus 1 pin 0x48:4')");

        let named = entity(Mux::A0Gnd, Gain::FullScale4_096, Some("battery".into()));
        assert_eq!(named.name(), "battery");
    }

    #[test]
    fn test_state_starts_unknown() {
        let entity = entity(Mux::A0A1, Gain::FullScale2_048, None);
        assert_eq!(entity.state(), None);
        assert_eq!(entity.attributes().state, None);
    }

    #[test]
    fn test_set_state_notifies_subscribers() {
        let entity = entity(Mux::A0A1, Gain::FullScale2_048, None);
        let mut receiver = entity.subscribe();
        assert!(!receiver.has_changed().expect("Sender dropped."));

        let voltage = raw_to_voltage(8192, Gain::FullScale2_048);
        entity.set_state(voltage);

        assert!(receiver.has_changed().expect("Sender dropped."));
        assert_eq!(*receiver.borrow_and_update(), Some(voltage));
        assert_eq!(entity.state(), Some(voltage));
        assert_eq!(entity.attributes().state, Some(0.512f32));
    }

    #[test]
    fn test_attributes() {
        let attributes = entity(Mux::A3Gnd, Gain::FullScale0_256, Some("bridge".into())).attributes();
        assert_eq!(attributes.unique_id, "ads1115.1.72.7");
        assert_eq!(attributes.name, "bridge");
        assert_eq!(attributes.unit_of_measurement, "V");
        assert_eq!(attributes.device_class, "voltage");
        assert_eq!(attributes.state_class, "measurement");
        assert!(attributes.should_poll);
    }
}

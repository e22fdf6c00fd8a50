use std::{fs, io, path::Path};

use tracing::{debug, info, instrument, trace, warn};

use crate::{
    internals::{device::probe, ports::I2cBusPort},
    models::device_key::{BusId, DeviceKey},
    ADDRESS_RANGE, SKIP_I2C_BUSES,
};

/// List the I2C adapters present in `dev_dir` (normally `/dev`), skipping
/// the ones reserved for the board itself.
#[instrument]
pub fn available_buses(dev_dir: &Path) -> io::Result<Vec<BusId>> {
    let mut buses: Vec<BusId> = fs::read_dir(dev_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            name.strip_prefix("i2c-")?.parse::<u8>().ok().map(BusId)
        })
        .filter(|bus| {
            let skip = SKIP_I2C_BUSES.contains(&bus.0);
            if skip {
                trace!("Skipping bus {}.", bus);
            }
            !skip
        })
        .collect();
    buses.sort();
    debug!("Found {} candidate buses.", buses.len());
    Ok(buses)
}

/// Probe every address of the chip's range on each bus. Anything that
/// doesn't answer is treated as not present.
#[instrument(skip(bus_port))]
pub fn scan(bus_port: &dyn I2cBusPort, buses: &[BusId]) -> Vec<DeviceKey> {
    let mut found = vec![];
    for &bus in buses {
        let mut handle = match bus_port.open(bus) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Skipping bus {}. Error: {}", bus, e);
                continue;
            }
        };
        for address in ADDRESS_RANGE {
            match probe(handle.as_mut(), address) {
                Ok(()) => {
                    info!("Found chip on bus {} at 0x{:02x}.", bus, address);
                    found.push(DeviceKey { bus, address });
                }
                Err(e) => trace!("Nothing at 0x{:02x} on bus {}. Error: {}", address, bus, e),
            }
        }
    }
    found
}

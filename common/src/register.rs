use crate::physical::{Gain, Mux, Voltage};

/// Register holding the last conversion result.
pub const REGISTER_CONVERSION: u8 = 0x00;

/// Register holding the device configuration.
pub const REGISTER_CONFIG: u8 = 0x01;

/// Low byte of the config register: 128 SPS, comparator disabled.
pub const CONFIG_LOW_BYTE: u8 = 0x83;

/// Number of conversion steps on each side of zero.
pub const STEPS_PER_FULL_SCALE: f32 = 32768f32;

/// Encode the two config register bytes which start a conversion of `mux`
/// with `gain`.
///
/// High byte layout: `OS | MUX[2:0] | PGA[2:0] | MODE`, OS is always set
/// and MODE is left at continuous.
///
/// ```
/// use common::{physical::{Gain, Mux}, register::read_request};
/// assert_eq!(read_request(Mux::A1A3, Gain::FullScale6_144), [0xA0, 0x83]);
/// ```
pub fn read_request(mux: Mux, gain: Gain) -> [u8; 2] {
    let high = ((((1u8 << 3) + mux.code()) << 3) + gain.code()) << 1;
    [high, CONFIG_LOW_BYTE]
}

/// Combine the big endian bytes read back from the conversion register.
pub fn raw_from_bytes(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Sign the raw conversion value.
///
/// Values above 32767 have 65535 removed, not 65536, so negative results
/// sit one step above a true two's complement reading.
pub fn raw_to_signed(raw: u16) -> i32 {
    let raw = raw as i32;
    if raw > 32767 {
        raw - 65535
    } else {
        raw
    }
}

/// Convert a raw conversion register value into a voltage for `gain`.
pub fn raw_to_voltage(raw: u16, gain: Gain) -> Voltage {
    let value = raw_to_signed(raw) as f32 * (gain.full_scale() / STEPS_PER_FULL_SCALE);
    Voltage::from_conversion(gain.full_scale(), value)
}

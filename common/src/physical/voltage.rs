use core::fmt::Display;

use thiserror_no_std::Error;

/// Store physical unit value of a signed voltage measured against a
/// full scale range. Differential inputs can go negative so the valid
/// state space is `-full_scale..=full_scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voltage {
    full_scale: f32,
    value: f32,
}

#[derive(Debug, Error)]
pub enum VoltageError {
    /// The Voltage was trying to be created with a value outside of the
    /// full scale range it was measured with.
    #[error("Value outside of valid state space representation!")]
    OutOfValidStateSpace,
}

impl Voltage {
    /// Construct a Voltage given a full scale range and current value.
    /// Will return `OutOfValidStateSpace` if the magnitude of the value is
    /// above the full scale range.
    pub fn new(full_scale: f32, value: f32) -> Result<Self, VoltageError> {
        if value.is_nan() || value < -full_scale || value > full_scale {
            return Err(VoltageError::OutOfValidStateSpace);
        }
        Ok(Self { full_scale, value })
    }

    /// Conversion results are bounded by construction, skip the check.
    pub(crate) fn from_conversion(full_scale: f32, value: f32) -> Self {
        Self { full_scale, value }
    }

    /// Get a copy of the full scale range this voltage was measured with.
    pub fn full_scale(&self) -> f32 {
        self.full_scale
    }

    /// Get a copy of the current voltage this instance does represent.
    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Display for Voltage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "<Voltage: {}/±{} V>", self.value(), self.full_scale())
    }
}

impl From<Voltage> for f32 {
    fn from(value: Voltage) -> Self {
        value.value
    }
}

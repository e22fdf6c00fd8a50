use core::{fmt::Display, str::FromStr};

use thiserror_no_std::Error;

/// Programmable gain amplifier setting. Each variant selects one of the
/// six full scale ranges of the chip.
///
/// Gains are configured with tokens of the form `<code>@<full scale>`:
///
/// ```
/// use common::physical::Gain;
/// let gain: Gain = "1@4.096".parse().expect("Failed to parse gain.");
/// assert_eq!(gain, Gain::FullScale4_096);
/// assert_eq!(gain.full_scale(), 4.096f32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gain {
    /// ±6.144 V
    #[default]
    FullScale6_144,
    /// ±4.096 V
    FullScale4_096,
    /// ±2.048 V
    FullScale2_048,
    /// ±1.024 V
    FullScale1_024,
    /// ±0.512 V
    FullScale0_512,
    /// ±0.256 V
    FullScale0_256,
}

/// Represents errors in parsing a gain token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GainError {
    /// The token is not one of the six `<code>@<full scale>` values.
    #[error("Unknown gain token!")]
    UnknownToken,
}

impl Gain {
    pub const ALL: [Gain; 6] = [
        Gain::FullScale6_144,
        Gain::FullScale4_096,
        Gain::FullScale2_048,
        Gain::FullScale1_024,
        Gain::FullScale0_512,
        Gain::FullScale0_256,
    ];

    /// Three bit PGA field of the config register.
    pub fn code(&self) -> u8 {
        match self {
            Gain::FullScale6_144 => 0,
            Gain::FullScale4_096 => 1,
            Gain::FullScale2_048 => 2,
            Gain::FullScale1_024 => 3,
            Gain::FullScale0_512 => 4,
            Gain::FullScale0_256 => 5,
        }
    }

    /// Full scale range in volts.
    pub fn full_scale(&self) -> f32 {
        match self {
            Gain::FullScale6_144 => 6.144,
            Gain::FullScale4_096 => 4.096,
            Gain::FullScale2_048 => 2.048,
            Gain::FullScale1_024 => 1.024,
            Gain::FullScale0_512 => 0.512,
            Gain::FullScale0_256 => 0.256,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Gain::FullScale6_144 => "0@6.144",
            Gain::FullScale4_096 => "1@4.096",
            Gain::FullScale2_048 => "2@2.048",
            Gain::FullScale1_024 => "3@1.024",
            Gain::FullScale0_512 => "4@0.512",
            Gain::FullScale0_256 => "5@0.256",
        }
    }
}

impl FromStr for Gain {
    type Err = GainError;

    /// The leading digit selects the range, the remainder must agree with it.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (code, full_scale) = token.trim().split_once('@').ok_or(GainError::UnknownToken)?;
        let gain = Gain::ALL
            .into_iter()
            .find(|gain| code.parse::<u8>().ok() == Some(gain.code()))
            .ok_or(GainError::UnknownToken)?;
        match full_scale.parse::<f32>() {
            Ok(value) if value == gain.full_scale() => Ok(gain),
            _ => Err(GainError::UnknownToken),
        }
    }
}

impl Display for Gain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.token())
    }
}

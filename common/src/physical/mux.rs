use core::{fmt::Display, str::FromStr};

use thiserror_no_std::Error;

/// Input multiplexer setting. The first four modes measure differential
/// pairs, the last four measure a single input against ground.
///
/// Tokens have the form `<code>@<pair>`, e.g. `2@A1-A3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Mux {
    #[default]
    A0A1,
    A0A3,
    A1A3,
    A2A3,
    A0Gnd,
    A1Gnd,
    A2Gnd,
    A3Gnd,
}

/// Represents errors in parsing a multiplexer token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MuxError {
    /// The token is not one of the eight `<code>@<pair>` values.
    #[error("Unknown multiplexer token!")]
    UnknownToken,
}

impl Mux {
    pub const ALL: [Mux; 8] = [
        Mux::A0A1,
        Mux::A0A3,
        Mux::A1A3,
        Mux::A2A3,
        Mux::A0Gnd,
        Mux::A1Gnd,
        Mux::A2Gnd,
        Mux::A3Gnd,
    ];

    /// Three bit MUX field of the config register. Also used as the slot
    /// index of a device.
    pub fn code(&self) -> u8 {
        match self {
            Mux::A0A1 => 0,
            Mux::A0A3 => 1,
            Mux::A1A3 => 2,
            Mux::A2A3 => 3,
            Mux::A0Gnd => 4,
            Mux::A1Gnd => 5,
            Mux::A2Gnd => 6,
            Mux::A3Gnd => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Mux::ALL.get(code as usize).copied()
    }

    pub fn token(&self) -> &'static str {
        match self {
            Mux::A0A1 => "0@A0-A1",
            Mux::A0A3 => "1@A0-A3",
            Mux::A1A3 => "2@A1-A3",
            Mux::A2A3 => "3@A2-A3",
            Mux::A0Gnd => "4@A0-GND",
            Mux::A1Gnd => "5@A1-GND",
            Mux::A2Gnd => "6@A2-GND",
            Mux::A3Gnd => "7@A3-GND",
        }
    }
}

impl FromStr for Mux {
    type Err = MuxError;

    /// Accepts the full token or just its leading code digit.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        let code = match token.split_once('@') {
            Some((code, _)) => code,
            None => token,
        };
        let mux = code
            .parse::<u8>()
            .ok()
            .and_then(Mux::from_code)
            .ok_or(MuxError::UnknownToken)?;
        if token.contains('@') && !mux.token().eq_ignore_ascii_case(token) {
            return Err(MuxError::UnknownToken);
        }
        Ok(mux)
    }
}

impl Display for Mux {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.token())
    }
}

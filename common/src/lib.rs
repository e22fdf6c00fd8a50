#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Register level model of the ADS1115 shared by every consumer of the chip.
//!
//! Nothing in here touches a bus. It only knows how to encode a conversion
//! request and how to turn the conversion register back into a voltage.

pub mod physical;
pub mod register;

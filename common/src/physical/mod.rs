mod gain;
mod mux;
mod voltage;

pub use gain::*;
pub use mux::*;
pub use voltage::*;

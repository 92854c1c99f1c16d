//! Temperature probes on the shared bus and touch identification

pub mod address;
pub mod touch;
pub mod traits;

pub use address::DeviceAddress;
pub use touch::{first_touched, TouchIdentifier, TouchPoll};
pub use traits::{BusError, TemperatureBus};

//! Telemetry: reading snapshots, the packet encoder and the transmit cycle

pub mod encoder;
pub mod scheduler;
pub mod types;

pub use encoder::{Packet, TelemetryEncoder, TelemetryError};
pub use scheduler::{CycleOutcome, CycleReport, SchedulerConfig, TransmitScheduler};
pub use types::{Reading, TransmissionStats};

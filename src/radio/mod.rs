//! Radio link used for telemetry

pub mod traits;

pub use traits::{LinkStats, Radio, RadioError};

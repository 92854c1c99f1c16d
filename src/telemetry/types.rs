//! Telemetry snapshots shared with the command surface

use crate::config::slots::{AMBIENT_SLOT, MAX_SLOTS};
use crate::radio::LinkStats;

/// Latest temperatures indexed by slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Degrees C per slot; slots past the active count are not meaningful
    pub temps: [f32; MAX_SLOTS],
    /// Seconds since boot at capture
    pub timestamp_s: u32,
    /// False until the first read cycle
    pub valid: bool,
}

impl Reading {
    pub const fn empty() -> Self {
        Self {
            temps: [0.0; MAX_SLOTS],
            timestamp_s: 0,
            valid: false,
        }
    }

    pub fn ambient(&self) -> f32 {
        self.temps[AMBIENT_SLOT]
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::empty()
    }
}

/// Transmit counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmissionStats {
    /// Packets handed to the radio successfully
    pub total_packets: u32,
    /// Milliseconds since boot of the last successful send
    pub last_packet_ms: u64,
    /// Link quality as reported by the radio after the last send
    pub link: LinkStats,
}

//! Telemetry packet encoder
//!
//! ```text
//! TX<id>:<p1>,<p2>,<p3>,<p4>,<p5>,<p6>,<p7>,<p8>,<p9>,<ambient>
//! ```
//!
//! Always ten values after the colon, one fractional digit each. Positions
//! without a probe carry the `0.0` placeholder so the receiver can index the
//! list directly.

use core::fmt::Write;

use heapless::String;

use crate::config::slots::{AMBIENT_SLOT, MAX_SLOTS};
use crate::config::telemetry::{EMPTY_POSITION, MAX_PACKET_LEN, PACKET_PREFIX};
use crate::telemetry::types::Reading;

/// Encoded telemetry line
pub type Packet = String<MAX_PACKET_LEN>;

/// Errors from building or sending a telemetry packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// Rendered values did not fit the packet buffer
    Overflow,
    /// The radio refused the packet
    Radio(crate::radio::RadioError),
}

impl From<core::fmt::Error> for TelemetryError {
    fn from(_: core::fmt::Error) -> Self {
        TelemetryError::Overflow
    }
}

pub struct TelemetryEncoder;

impl TelemetryEncoder {
    /// Render `reading` for a configuration with `active_count` slots
    pub fn encode(
        active_count: u8,
        reading: &Reading,
        transmitter_id: u16,
    ) -> Result<Packet, TelemetryError> {
        let active = (active_count as usize).min(MAX_SLOTS);
        let mut packet = Packet::new();

        write!(packet, "{}{}:", PACKET_PREFIX, transmitter_id)?;
        for slot in 1..MAX_SLOTS {
            if slot < active {
                write!(packet, "{:.1},", reading.temps[slot])?;
            } else {
                write!(packet, "{},", EMPTY_POSITION)?;
            }
        }
        write!(packet, "{:.1}", reading.temps[AMBIENT_SLOT])?;

        Ok(packet)
    }
}

//! Firmware configuration constants for the AxleWatch transmitter
//!
//! The touch threshold and every timing value below were tuned on real
//! hardware. Runtime code takes them through [`crate::setup::SetupTiming`]
//! and [`crate::telemetry::SchedulerConfig`] so tests and boards can override
//! them.

/// Slot table dimensions
pub mod slots {
    /// Total number of slots (ambient + nine positions)
    pub const MAX_SLOTS: usize = 10;

    /// Slot index of the mandatory ambient probe
    pub const AMBIENT_SLOT: usize = 0;

    /// Length of a bus device address in bytes
    pub const ADDRESS_LEN: usize = 8;

    /// Maximum number of devices considered during a setup scan
    pub const MAX_BUS_DEVICES: usize = 16;

    /// Temperature reported for a probe that did not answer
    pub const DISCONNECTED_TEMP_C: f32 = -127.0;
}

/// Identification and operator timing
pub mod timing {
    /// Temperature change (degrees C) that counts as a touch
    pub const TOUCH_THRESHOLD_C: f32 = 1.5;

    /// Budget for identifying the ambient probe
    pub const AMBIENT_BUDGET_MS: u32 = 30_000;

    /// Wait window for each optional position
    pub const POSITION_WINDOW_MS: u32 = 60_000;

    /// Hold duration that saves the setup
    pub const SAVE_HOLD_MS: u32 = 5_000;

    /// Hold duration that enters setup during normal operation
    pub const SETUP_HOLD_MS: u32 = 3_000;

    /// Re-sampling cadence while waiting for a touch
    pub const POLL_INTERVAL_MS: u32 = 500;

    /// Settle time after requesting the baseline conversion
    pub const BASELINE_SETTLE_MS: u32 = 1_000;

    /// Interval between telemetry transmissions
    pub const TRANSMIT_INTERVAL_MS: u32 = 30_000;

    /// Suspension length in power save mode
    pub const SLEEP_DURATION_MS: u32 = 30_000;

    /// Heartbeat blink period while idle and awake
    pub const HEARTBEAT_INTERVAL_MS: u32 = 5_000;
}

/// Persistent store geometry
pub mod storage {
    /// Size of the emulated EEPROM region
    pub const STORE_SIZE: usize = 512;

    /// Marker written in front of a trusted slot table
    pub const MAGIC: u16 = 0xABCD;

    /// Value of an erased storage byte
    pub const ERASED: u8 = 0xFF;

    /// Transmitter id value that means "never written"
    pub const TRANSMITTER_ID_ABSENT: u16 = 0xFFFF;
}

/// Device identity defaults
pub mod identity {
    /// Fixed-length name field, including the NUL terminator
    pub const DEVICE_NAME_FIELD_LEN: usize = 32;

    /// Longest usable device name
    pub const MAX_DEVICE_NAME_LEN: usize = DEVICE_NAME_FIELD_LEN - 1;

    /// Name used when the stored one is missing or invalid
    pub const DEFAULT_DEVICE_NAME: &str = "AxleWatch-TX";

    /// Transmitter id used when none is stored
    pub const DEFAULT_TRANSMITTER_ID: u16 = 1;

    /// Power save mode when none is stored
    pub const DEFAULT_POWER_SAVE: bool = false;
}

/// Telemetry line format
pub mod telemetry {
    /// Literal prefix in front of the transmitter id
    pub const PACKET_PREFIX: &str = "TX";

    /// Placeholder for positions without a probe
    pub const EMPTY_POSITION: &str = "0.0";

    /// Upper bound of an encoded packet
    pub const MAX_PACKET_LEN: usize = 128;
}

/// Command protocol constants
pub mod protocol {
    /// Frame delimiter for COBS encoding
    pub const FRAME_DELIMITER: u8 = 0x00;

    /// Maximum frame size
    pub const MAX_FRAME_SIZE: usize = 256;

    /// Maximum payload size of a single command or response
    pub const MAX_PAYLOAD: usize = 192;

    /// Protocol version (increment when message format changes)
    pub const PROTOCOL_VERSION: u8 = 1;

    /// Firmware version
    pub const VERSION_MAJOR: u8 = 0;
    pub const VERSION_MINOR: u8 = 1;
    pub const VERSION_PATCH: u8 = 0;
}

/// Operator log ring
pub mod logbuf {
    /// Number of retained entries
    pub const CAPACITY: usize = 100;

    /// Longest stored message
    pub const MAX_MESSAGE_LEN: usize = 160;
}

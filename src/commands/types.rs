//! Command and response types for the binary protocol
//!
//! # Protocol Format
//!
//! All frames use COBS encoding with a zero byte delimiter:
//! ```text
//! [COBS-encoded payload][0x00]
//! ```
//!
//! The payload format (before COBS encoding):
//! ```text
//! [version: u8][cmd_id: u8][length: u16 LE][payload: [u8; length]][crc16: u16 LE]
//! ```
//!
//! - `version`: Protocol version (currently 1)
//! - `cmd_id`: Command or response identifier
//! - `length`: Payload length in bytes (little-endian)
//! - `crc16`: CRC-16-XMODEM checksum over all preceding bytes
//!
//! Multi-byte fields inside payloads are little-endian. Temperatures are
//! sent as `i16` tenths of a degree.

use crate::device::{ConfigurationSnapshot, Settings};
use crate::logbuf::LogEntry;
use crate::storage::DeviceName;
use crate::telemetry::{Reading, TransmissionStats};

/// Command IDs for the binary protocol
///
/// Commands are sent from the host to the device. Each command has a specific
/// payload format and expected response.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    /// Get firmware version (0x01)
    ///
    /// - Payload: None
    /// - Response: [`Response::Version`]
    GetVersion = 0x01,

    /// Get name, transmitter id and power mode (0x02)
    ///
    /// - Payload: None
    /// - Response: [`Response::Settings`]
    GetSettings = 0x02,

    /// Set and persist the transmitter id (0x03)
    ///
    /// - Payload: `[id: u16 LE]`
    /// - Response: [`Response::Settings`]
    SetTransmitterId = 0x03,

    /// Set and persist the power save flag (0x04)
    ///
    /// - Payload: `[enabled: u8]`, 0 or 1
    /// - Response: [`Response::Settings`]
    SetPowerMode = 0x04,

    /// Set and persist the device name (0x05)
    ///
    /// - Payload: 1-31 printable ASCII bytes
    /// - Response: [`Response::Settings`]
    SetDeviceName = 0x05,

    /// Enter probe setup at the next loop iteration (0x06)
    ///
    /// - Payload: None
    /// - Response: [`Response::Ack`]
    EnterSetup = 0x06,

    /// Get the slot mapping (0x10)
    ///
    /// - Payload: None
    /// - Response: [`Response::Configuration`]
    GetConfiguration = 0x10,

    /// Get the latest reading (0x11)
    ///
    /// - Payload: None
    /// - Response: [`Response::Reading`]
    GetReading = 0x11,

    /// Get transmit counters (0x12)
    ///
    /// - Payload: None
    /// - Response: [`Response::Stats`]
    GetStats = 0x12,

    /// Get one line of the operator log (0x13)
    ///
    /// - Payload: `[index: u16 LE]`, 0 is the oldest line
    /// - Response: [`Response::LogEntry`]
    GetLogEntry = 0x13,
}

impl CommandId {
    /// Try to convert a byte to a CommandId
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::GetVersion),
            0x02 => Some(Self::GetSettings),
            0x03 => Some(Self::SetTransmitterId),
            0x04 => Some(Self::SetPowerMode),
            0x05 => Some(Self::SetDeviceName),
            0x06 => Some(Self::EnterSetup),
            0x10 => Some(Self::GetConfiguration),
            0x11 => Some(Self::GetReading),
            0x12 => Some(Self::GetStats),
            0x13 => Some(Self::GetLogEntry),
            _ => None,
        }
    }
}

/// Parsed command with associated data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetVersion,
    GetSettings,
    SetTransmitterId { id: u16 },
    SetPowerMode { enabled: bool },
    SetDeviceName { name: DeviceName },
    EnterSetup,
    GetConfiguration,
    GetReading,
    GetStats,
    GetLogEntry { index: u16 },
}

impl Command {
    /// Get the command ID for this command
    pub fn id(&self) -> CommandId {
        match self {
            Command::GetVersion => CommandId::GetVersion,
            Command::GetSettings => CommandId::GetSettings,
            Command::SetTransmitterId { .. } => CommandId::SetTransmitterId,
            Command::SetPowerMode { .. } => CommandId::SetPowerMode,
            Command::SetDeviceName { .. } => CommandId::SetDeviceName,
            Command::EnterSetup => CommandId::EnterSetup,
            Command::GetConfiguration => CommandId::GetConfiguration,
            Command::GetReading => CommandId::GetReading,
            Command::GetStats => CommandId::GetStats,
            Command::GetLogEntry { .. } => CommandId::GetLogEntry,
        }
    }
}

/// Response status codes
///
/// Used in [`Response::Error`] to indicate why a command failed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Command executed successfully (0x00)
    Success = 0x00,

    /// Unknown or invalid command ID (0x01)
    InvalidCommand = 0x01,

    /// Payload length invalid for the command (0x02)
    InvalidLength = 0x02,

    /// CRC-16 checksum mismatch (0x03)
    CrcError = 0x03,

    /// Protocol version not supported (0x04)
    InvalidVersion = 0x04,

    /// Payload value outside its domain (0x05)
    ///
    /// Examples: power flag other than 0/1, non-printable name byte
    InvalidValue = 0x05,

    /// Requested item does not exist (0x06)
    NotFound = 0x06,

    /// Persisting the change failed (0x10)
    StorageError = 0x10,
}

/// Response to a command
///
/// Responses use the same frame format as commands but with response IDs.
///
/// | ID   | Response      | Description                    |
/// |------|---------------|--------------------------------|
/// | 0x01 | Version       | Firmware version               |
/// | 0x02 | Settings      | Operator settings              |
/// | 0x06 | Ack           | Request accepted               |
/// | 0x10 | Configuration | Slot mapping                   |
/// | 0x11 | Reading       | Latest temperatures            |
/// | 0x12 | Stats         | Transmit counters              |
/// | 0x13 | LogEntry      | One operator log line          |
/// | 0xFF | Error         | Error with status code         |
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Payload: `[major: u8][minor: u8][patch: u8]`
    Version { major: u8, minor: u8, patch: u8 },

    /// Payload: `[id: u16][power_save: u8][configured: u8][active_count: u8]
    /// [name_len: u8][name...]`
    Settings(Settings),

    /// Payload: None
    Ack,

    /// Payload: `[configured: u8][status: u8][active_count: u8]
    /// [address: [u8; 8]] * active_count`
    ///
    /// Status is 0 = configured, 1 = untrusted, 2 = corrupt. Unassigned
    /// slots inside the active count are sent as zero addresses.
    Configuration(ConfigurationSnapshot),

    /// Payload: `[valid: u8][timestamp_s: u32][active_count: u8]
    /// [temp: i16] * active_count`, slot order
    Reading { reading: Reading, active_count: u8 },

    /// Payload: `[total_packets: u32][last_packet_ms: u64][rssi: i16][snr: i8]`
    Stats(TransmissionStats),

    /// Payload: `[index: u16][total: u16][timestamp_ms: u64][message...]`
    LogEntry {
        index: u16,
        total: u16,
        entry: LogEntry,
    },

    /// Payload: `[status: u8][original_command_id: u8]`
    Error {
        status: ResponseStatus,
        original_command_id: u8,
    },
}

impl Response {
    /// Create an error response for a given command
    pub fn error(status: ResponseStatus, command_id: CommandId) -> Self {
        Self::Error {
            status,
            original_command_id: command_id as u8,
        }
    }

    /// Create an error response with raw command ID (for unknown commands)
    pub fn error_raw(status: ResponseStatus, original_command_id: u8) -> Self {
        Self::Error {
            status,
            original_command_id,
        }
    }
}

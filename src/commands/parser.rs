//! Command parser for COBS-decoded frames
//!
//! Parses binary protocol frames into Command structs.

use crate::commands::types::{Command, CommandId, ResponseStatus};
use crate::config::identity::MAX_DEVICE_NAME_LEN;
use crate::config::protocol::PROTOCOL_VERSION;
use crate::storage::metadata::{validate_name, NameError};
use crate::storage::DeviceName;
use crc::{Crc, CRC_16_XMODEM};

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Parser for binary protocol commands
pub struct CommandParser;

impl CommandParser {
    /// Create a new command parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a COBS-decoded frame into a command
    ///
    /// Frame format: [version: u8][cmd_id: u8][length: u16 LE][payload][crc16: u16 LE]
    /// Minimum frame size: 1 (ver) + 1 (cmd) + 2 (length) + 0 (payload) + 2 (crc) = 6 bytes
    pub fn parse(&self, data: &[u8]) -> Result<Command, ResponseStatus> {
        if data.len() < 6 {
            return Err(ResponseStatus::InvalidLength);
        }

        let version = data[0];
        let command_id_byte = data[1];
        let length = u16::from_le_bytes([data[2], data[3]]) as usize;

        if version != PROTOCOL_VERSION {
            return Err(ResponseStatus::InvalidVersion);
        }

        // Check if we have enough bytes for payload + CRC
        let expected_len = 4 + length + 2;
        if data.len() < expected_len {
            return Err(ResponseStatus::InvalidLength);
        }

        let payload = &data[4..4 + length];
        let received_crc = u16::from_le_bytes([data[4 + length], data[5 + length]]);

        // Verify CRC over version + command_id + length + payload
        let calculated_crc = Self::calculate_crc(&data[..4 + length]);
        if calculated_crc != received_crc {
            return Err(ResponseStatus::CrcError);
        }

        let Some(command_id) = CommandId::from_byte(command_id_byte) else {
            return Err(ResponseStatus::InvalidCommand);
        };

        match command_id {
            CommandId::GetVersion => Self::empty(payload, Command::GetVersion),
            CommandId::GetSettings => Self::empty(payload, Command::GetSettings),
            CommandId::EnterSetup => Self::empty(payload, Command::EnterSetup),
            CommandId::GetConfiguration => Self::empty(payload, Command::GetConfiguration),
            CommandId::GetReading => Self::empty(payload, Command::GetReading),
            CommandId::GetStats => Self::empty(payload, Command::GetStats),
            CommandId::SetTransmitterId => {
                let id = Self::le_u16(payload)?;
                Ok(Command::SetTransmitterId { id })
            }
            CommandId::GetLogEntry => {
                let index = Self::le_u16(payload)?;
                Ok(Command::GetLogEntry { index })
            }
            CommandId::SetPowerMode => match payload {
                [0] => Ok(Command::SetPowerMode { enabled: false }),
                [1] => Ok(Command::SetPowerMode { enabled: true }),
                [_] => Err(ResponseStatus::InvalidValue),
                _ => Err(ResponseStatus::InvalidLength),
            },
            CommandId::SetDeviceName => Self::device_name(payload),
        }
    }

    fn empty(payload: &[u8], command: Command) -> Result<Command, ResponseStatus> {
        if payload.is_empty() {
            Ok(command)
        } else {
            Err(ResponseStatus::InvalidLength)
        }
    }

    fn le_u16(payload: &[u8]) -> Result<u16, ResponseStatus> {
        match payload {
            [lo, hi] => Ok(u16::from_le_bytes([*lo, *hi])),
            _ => Err(ResponseStatus::InvalidLength),
        }
    }

    fn device_name(payload: &[u8]) -> Result<Command, ResponseStatus> {
        if payload.is_empty() || payload.len() > MAX_DEVICE_NAME_LEN {
            return Err(ResponseStatus::InvalidLength);
        }
        let text = core::str::from_utf8(payload).map_err(|_| ResponseStatus::InvalidValue)?;
        validate_name(text).map_err(|e| match e {
            NameError::NotPrintable => ResponseStatus::InvalidValue,
            NameError::Empty | NameError::TooLong => ResponseStatus::InvalidLength,
        })?;

        let mut name = DeviceName::new();
        name.push_str(text)
            .map_err(|_| ResponseStatus::InvalidLength)?;
        Ok(Command::SetDeviceName { name })
    }

    /// Calculate CRC-16-XMODEM
    fn calculate_crc(data: &[u8]) -> u16 {
        CRC.checksum(data)
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate CRC-16-XMODEM for external use (e.g., building test frames)
pub fn calculate_crc(data: &[u8]) -> u16 {
    CommandParser::calculate_crc(data)
}

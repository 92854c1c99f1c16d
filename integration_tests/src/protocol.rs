//! Host-side view of the transmitter's command protocol.

#![allow(dead_code)]

use crc::{Crc, CRC_16_XMODEM};

/// Protocol version (must match firmware)
pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    GetVersion = 0x01,
    GetSettings = 0x02,
    SetTransmitterId = 0x03,
    SetPowerMode = 0x04,
    SetDeviceName = 0x05,
    EnterSetup = 0x06,
    GetConfiguration = 0x10,
    GetReading = 0x11,
    GetStats = 0x12,
    GetLogEntry = 0x13,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseStatus {
    Success = 0x00,
    InvalidCommand = 0x01,
    InvalidLength = 0x02,
    CrcError = 0x03,
    InvalidVersion = 0x04,
    InvalidValue = 0x05,
    NotFound = 0x06,
    StorageError = 0x10,
}

impl TryFrom<u8> for ResponseStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ResponseStatus::Success),
            0x01 => Ok(ResponseStatus::InvalidCommand),
            0x02 => Ok(ResponseStatus::InvalidLength),
            0x03 => Ok(ResponseStatus::CrcError),
            0x04 => Ok(ResponseStatus::InvalidVersion),
            0x05 => Ok(ResponseStatus::InvalidValue),
            0x06 => Ok(ResponseStatus::NotFound),
            0x10 => Ok(ResponseStatus::StorageError),
            _ => Err(value),
        }
    }
}

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Build a command frame (without COBS encoding).
/// Format: [version: u8][cmd_id: u8][length: u16 LE][payload][crc16: u16 LE]
pub fn build_command_payload(cmd_id: u8, payload: &[u8]) -> Vec<u8> {
    let length = payload.len() as u16;
    let mut data = Vec::with_capacity(6 + payload.len());

    data.push(PROTOCOL_VERSION);
    data.push(cmd_id);
    data.extend_from_slice(&length.to_le_bytes());
    data.extend_from_slice(payload);

    let checksum = CRC.checksum(&data);
    data.extend_from_slice(&checksum.to_le_bytes());

    data
}

/// COBS encode; corncobs appends the zero delimiter.
pub fn cobs_encode(data: &[u8]) -> Vec<u8> {
    let mut encoded = vec![0u8; corncobs::max_encoded_len(data.len())];
    let len = corncobs::encode_buf(data, &mut encoded);
    encoded.truncate(len);
    encoded
}

/// Build a complete COBS-encoded command frame.
pub fn build_command(cmd_id: CommandId, payload: &[u8]) -> Vec<u8> {
    let raw = build_command_payload(cmd_id as u8, payload);
    cobs_encode(&raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseId {
    Version = 0x01,
    Settings = 0x02,
    Ack = 0x06,
    Configuration = 0x10,
    Reading = 0x11,
    Stats = 0x12,
    LogEntry = 0x13,
    Error = 0xFF,
}

impl TryFrom<u8> for ResponseId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        match value {
            0x01 => Ok(ResponseId::Version),
            0x02 => Ok(ResponseId::Settings),
            0x06 => Ok(ResponseId::Ack),
            0x10 => Ok(ResponseId::Configuration),
            0x11 => Ok(ResponseId::Reading),
            0x12 => Ok(ResponseId::Stats),
            0x13 => Ok(ResponseId::LogEntry),
            0xFF => Ok(ResponseId::Error),
            _ => Err(value),
        }
    }
}

/// Parsed response from the device.
#[derive(Debug)]
pub struct Response {
    pub version: u8,
    pub resp_id: ResponseId,
    pub payload: Vec<u8>,
}

impl Response {
    /// Status byte of an Error response
    pub fn error_status(&self) -> Option<u8> {
        match self.resp_id {
            ResponseId::Error => self.payload.first().copied(),
            _ => None,
        }
    }
}

/// Decoded Settings payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub transmitter_id: u16,
    pub power_save: bool,
    pub configured: bool,
    pub active_count: u8,
    pub name: String,
}

/// Settings payload: [id u16][power_save u8][configured u8][active u8][name_len u8][name]
pub fn parse_settings(payload: &[u8]) -> anyhow::Result<Settings> {
    if payload.len() < 6 {
        anyhow::bail!("Settings payload too short: {} bytes", payload.len());
    }
    let name_len = payload[5] as usize;
    let name = payload
        .get(6..6 + name_len)
        .ok_or_else(|| anyhow::anyhow!("Settings name truncated"))?;
    Ok(Settings {
        transmitter_id: u16::from_le_bytes([payload[0], payload[1]]),
        power_save: payload[2] != 0,
        configured: payload[3] != 0,
        active_count: payload[4],
        name: String::from_utf8(name.to_vec())?,
    })
}

/// Parse a COBS-decoded response.
/// Format: [version: u8][resp_id: u8][length: u16 LE][payload][crc: u16 LE]
pub fn parse_response(data: &[u8]) -> anyhow::Result<Response> {
    if data.len() < 6 {
        anyhow::bail!("Response too short: {} bytes", data.len());
    }

    let version = data[0];
    let resp_id_byte = data[1];
    let length = u16::from_le_bytes([data[2], data[3]]) as usize;

    if data.len() < 4 + length + 2 {
        anyhow::bail!(
            "Response payload incomplete: expected {}, got {}",
            4 + length + 2,
            data.len()
        );
    }

    let payload = data[4..4 + length].to_vec();
    let received_crc = u16::from_le_bytes([data[4 + length], data[4 + length + 1]]);

    let calculated_crc = CRC.checksum(&data[..4 + length]);
    if calculated_crc != received_crc {
        anyhow::bail!(
            "CRC mismatch: expected {:04x}, got {:04x}",
            calculated_crc,
            received_crc
        );
    }

    if version != PROTOCOL_VERSION {
        anyhow::bail!(
            "Protocol version mismatch: expected {}, got {}",
            PROTOCOL_VERSION,
            version
        );
    }

    let resp_id = ResponseId::try_from(resp_id_byte)
        .map_err(|v| anyhow::anyhow!("Unknown response ID: {:#04x}", v))?;

    Ok(Response {
        version,
        resp_id,
        payload,
    })
}

/// COBS decode a frame (delimiter included).
pub fn cobs_decode(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut decoded = vec![0u8; data.len()];
    let len = corncobs::decode_buf(data, &mut decoded)
        .map_err(|e| anyhow::anyhow!("COBS decode error: {:?}", e))?;
    decoded.truncate(len);
    Ok(decoded)
}

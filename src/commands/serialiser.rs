//! Response serialiser with COBS encoding
//!
//! Serialises Response structs into COBS-encoded frames for transmission.

use crate::commands::parser::calculate_crc;
use crate::commands::types::Response;
use crate::config::protocol::{MAX_FRAME_SIZE, MAX_PAYLOAD, PROTOCOL_VERSION};
use crate::config::slots::MAX_SLOTS;
use crate::device::{ConfigurationSnapshot, Settings};
use crate::storage::LoadStatus;
use crate::telemetry::Reading;
use heapless::Vec;

/// Response IDs (mirror the command that produced them where there is one)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

type Payload = Vec<u8, MAX_PAYLOAD>;

/// Temperature in tenths of a degree, rounded half away from zero
pub fn tenths(celsius: f32) -> i16 {
    let scaled = celsius * 10.0;
    let rounded = if scaled >= 0.0 {
        scaled + 0.5
    } else {
        scaled - 0.5
    };
    rounded as i16
}

/// Serialiser for response frames
pub struct ResponseSerialiser;

impl ResponseSerialiser {
    /// Create a new response serialiser
    pub fn new() -> Self {
        Self
    }

    /// Serialise a response to a COBS-encoded frame
    ///
    /// Returns the complete frame including COBS encoding and zero delimiter.
    pub fn serialise(&self, response: &Response) -> Vec<u8, MAX_FRAME_SIZE> {
        let raw = self.build_raw_frame(response);
        // corncobs::encode_buf includes the trailing zero delimiter
        self.cobs_encode(&raw)
    }

    /// Build the raw (unencoded) frame with CRC
    ///
    /// Frame format: [version: u8][resp_id: u8][length: u16 LE][payload][crc16: u16 LE]
    fn build_raw_frame(&self, response: &Response) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut payload = Payload::new();
        let id = Self::write_payload(response, &mut payload);

        let mut frame: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        let _ = frame.push(PROTOCOL_VERSION);
        let _ = frame.push(id as u8);
        let _ = frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        let _ = frame.extend_from_slice(&payload);

        let crc = calculate_crc(&frame);
        let _ = frame.extend_from_slice(&crc.to_le_bytes());

        frame
    }

    fn write_payload(response: &Response, out: &mut Payload) -> ResponseId {
        match response {
            Response::Version {
                major,
                minor,
                patch,
            } => {
                let _ = out.extend_from_slice(&[*major, *minor, *patch]);
                ResponseId::Version
            }
            Response::Settings(settings) => {
                Self::write_settings(settings, out);
                ResponseId::Settings
            }
            Response::Ack => ResponseId::Ack,
            Response::Configuration(snapshot) => {
                Self::write_configuration(snapshot, out);
                ResponseId::Configuration
            }
            Response::Reading {
                reading,
                active_count,
            } => {
                Self::write_reading(reading, *active_count, out);
                ResponseId::Reading
            }
            Response::Stats(stats) => {
                let _ = out.extend_from_slice(&stats.total_packets.to_le_bytes());
                let _ = out.extend_from_slice(&stats.last_packet_ms.to_le_bytes());
                let _ = out.extend_from_slice(&stats.link.rssi.to_le_bytes());
                let _ = out.push(stats.link.snr as u8);
                ResponseId::Stats
            }
            Response::LogEntry {
                index,
                total,
                entry,
            } => {
                let _ = out.extend_from_slice(&index.to_le_bytes());
                let _ = out.extend_from_slice(&total.to_le_bytes());
                let _ = out.extend_from_slice(&entry.timestamp_ms.to_le_bytes());
                let room = out.capacity() - out.len();
                let message = entry.message.as_bytes();
                let _ = out.extend_from_slice(&message[..message.len().min(room)]);
                ResponseId::LogEntry
            }
            Response::Error {
                status,
                original_command_id,
            } => {
                let _ = out.push(*status as u8);
                let _ = out.push(*original_command_id);
                ResponseId::Error
            }
        }
    }

    fn write_settings(settings: &Settings, out: &mut Payload) {
        let _ = out.extend_from_slice(&settings.transmitter_id.to_le_bytes());
        let _ = out.push(settings.power_save as u8);
        let _ = out.push(settings.configured as u8);
        let _ = out.push(settings.active_count);
        let _ = out.push(settings.name.len() as u8);
        let _ = out.extend_from_slice(settings.name.as_bytes());
    }

    fn write_configuration(snapshot: &ConfigurationSnapshot, out: &mut Payload) {
        let status = match snapshot.status {
            LoadStatus::Configured => 0,
            LoadStatus::Untrusted(_) => 1,
            LoadStatus::Corrupt(_) => 2,
        };
        let active = snapshot.configuration.active_count().min(MAX_SLOTS as u8);
        let _ = out.push(snapshot.configured as u8);
        let _ = out.push(status);
        let _ = out.push(active);
        for slot in 0..active as usize {
            let bytes = snapshot
                .configuration
                .slot(slot)
                .map(|address| *address.as_bytes())
                .unwrap_or_default();
            let _ = out.extend_from_slice(&bytes);
        }
    }

    fn write_reading(reading: &Reading, active_count: u8, out: &mut Payload) {
        let active = active_count.min(MAX_SLOTS as u8);
        let _ = out.push(reading.valid as u8);
        let _ = out.extend_from_slice(&reading.timestamp_s.to_le_bytes());
        let _ = out.push(active);
        for temp in &reading.temps[..active as usize] {
            let _ = out.extend_from_slice(&tenths(*temp).to_le_bytes());
        }
    }

    /// COBS encode a buffer using corncobs
    fn cobs_encode(&self, data: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut output: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        output.resize(corncobs::max_encoded_len(data.len()), 0).ok();
        let len = corncobs::encode_buf(data, &mut output);
        output.truncate(len);
        output
    }
}

impl Default for ResponseSerialiser {
    fn default() -> Self {
        Self::new()
    }
}

/// COBS decode using corncobs
#[allow(clippy::result_unit_err)]
pub fn cobs_decode(encoded: &[u8]) -> Result<Vec<u8, MAX_FRAME_SIZE>, ()> {
    let mut output: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
    output.resize(encoded.len(), 0).map_err(|_| ())?;
    let len = corncobs::decode_buf(encoded, &mut output).map_err(|_| ())?;
    output.truncate(len);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::{CommandId, ResponseStatus};
    use crate::config::protocol::FRAME_DELIMITER;
    use crate::logbuf::LogEntry;
    use crate::radio::LinkStats;
    use crate::sensors::DeviceAddress;
    use crate::storage::{Configuration, DeviceName, UntrustedReason};
    use crate::telemetry::TransmissionStats;

    /// Serialise, check the delimiter and CRC, return the decoded frame
    fn roundtrip(response: &Response) -> Vec<u8, MAX_FRAME_SIZE> {
        let encoded = ResponseSerialiser::new().serialise(response);
        assert_eq!(encoded[encoded.len() - 1], FRAME_DELIMITER);

        let decoded = cobs_decode(&encoded).expect("Should decode");
        assert_eq!(decoded[0], PROTOCOL_VERSION);
        let length = u16::from_le_bytes([decoded[2], decoded[3]]) as usize;
        assert_eq!(decoded.len(), 4 + length + 2);
        let crc = u16::from_le_bytes([decoded[4 + length], decoded[5 + length]]);
        assert_eq!(crc, calculate_crc(&decoded[..4 + length]));
        decoded
    }

    fn payload(decoded: &[u8]) -> &[u8] {
        &decoded[4..decoded.len() - 2]
    }

    #[test]
    fn test_serialise_version() {
        let decoded = roundtrip(&Response::Version {
            major: 0,
            minor: 1,
            patch: 0,
        });
        assert_eq!(decoded[1], ResponseId::Version as u8);
        assert_eq!(payload(&decoded), &[0, 1, 0]);
    }

    #[test]
    fn test_serialise_ack() {
        let decoded = roundtrip(&Response::Ack);
        assert_eq!(decoded[1], ResponseId::Ack as u8);
        assert!(payload(&decoded).is_empty());
    }

    #[test]
    fn test_serialise_settings() {
        let mut name = DeviceName::new();
        name.push_str("Rig 4").unwrap();
        let decoded = roundtrip(&Response::Settings(Settings {
            name,
            transmitter_id: 0x0102,
            power_save: true,
            configured: true,
            active_count: 3,
        }));

        assert_eq!(decoded[1], ResponseId::Settings as u8);
        assert_eq!(
            payload(&decoded),
            &[0x02, 0x01, 1, 1, 3, 5, b'R', b'i', b'g', b' ', b'4']
        );
    }

    #[test]
    fn test_serialise_configuration() {
        let ambient = DeviceAddress::new([0x28, 1, 2, 3, 4, 5, 6, 7]);
        let mut configuration = Configuration::cleared();
        configuration.assign(0, ambient).unwrap();
        let decoded = roundtrip(&Response::Configuration(ConfigurationSnapshot {
            configuration,
            configured: true,
            status: LoadStatus::Configured,
        }));

        let body = payload(&decoded);
        assert_eq!(decoded[1], ResponseId::Configuration as u8);
        assert_eq!(&body[..3], &[1, 0, 1]);
        assert_eq!(&body[3..], ambient.as_bytes());
    }

    #[test]
    fn test_serialise_unconfigured_snapshot() {
        let decoded = roundtrip(&Response::Configuration(ConfigurationSnapshot {
            configuration: Configuration::unconfigured(),
            configured: false,
            status: LoadStatus::Untrusted(UntrustedReason::MagicMismatch(0xFFFF)),
        }));

        // Ambient slot counted but unassigned
        assert_eq!(payload(&decoded), &[0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_serialise_reading() {
        let mut reading = Reading::empty();
        reading.temps[0] = 25.14;
        reading.temps[1] = -127.0;
        reading.timestamp_s = 90;
        reading.valid = true;

        let decoded = roundtrip(&Response::Reading {
            reading,
            active_count: 2,
        });

        let body = payload(&decoded);
        assert_eq!(decoded[1], ResponseId::Reading as u8);
        assert_eq!(body[0], 1);
        assert_eq!(&body[1..5], &90u32.to_le_bytes());
        assert_eq!(body[5], 2);
        assert_eq!(i16::from_le_bytes([body[6], body[7]]), 251);
        assert_eq!(i16::from_le_bytes([body[8], body[9]]), -1270);
    }

    #[test]
    fn test_serialise_stats() {
        let decoded = roundtrip(&Response::Stats(TransmissionStats {
            total_packets: 12,
            last_packet_ms: 360_000,
            link: LinkStats { rssi: -95, snr: -3 },
        }));

        let body = payload(&decoded);
        assert_eq!(body.len(), 4 + 8 + 2 + 1);
        assert_eq!(&body[..4], &12u32.to_le_bytes());
        assert_eq!(&body[4..12], &360_000u64.to_le_bytes());
        assert_eq!(i16::from_le_bytes([body[12], body[13]]), -95);
        assert_eq!(body[14] as i8, -3);
    }

    #[test]
    fn test_serialise_log_entry() {
        let mut entry = LogEntry {
            timestamp_ms: 1_500,
            message: heapless::String::new(),
        };
        entry.message.push_str("Setup complete").unwrap();

        let decoded = roundtrip(&Response::LogEntry {
            index: 3,
            total: 10,
            entry,
        });

        let body = payload(&decoded);
        assert_eq!(decoded[1], ResponseId::LogEntry as u8);
        assert_eq!(&body[..2], &3u16.to_le_bytes());
        assert_eq!(&body[2..4], &10u16.to_le_bytes());
        assert_eq!(&body[4..12], &1_500u64.to_le_bytes());
        assert_eq!(&body[12..], b"Setup complete");
    }

    #[test]
    fn test_serialise_error() {
        let decoded = roundtrip(&Response::error(
            ResponseStatus::StorageError,
            CommandId::SetDeviceName,
        ));

        assert_eq!(decoded[1], ResponseId::Error as u8);
        assert_eq!(
            payload(&decoded),
            &[ResponseStatus::StorageError as u8, CommandId::SetDeviceName as u8]
        );
    }

    #[test]
    fn test_tenths_rounding() {
        assert_eq!(tenths(21.46), 215);
        assert_eq!(tenths(-0.04), 0);
        assert_eq!(tenths(-5.26), -53);
    }

    #[test]
    fn test_cobs_roundtrip() {
        let serialiser = ResponseSerialiser::new();

        let data_with_zeros = [0x01, 0x00, 0x02, 0x00, 0x03];
        let encoded = serialiser.cobs_encode(&data_with_zeros);

        assert_eq!(encoded[encoded.len() - 1], 0x00, "Should end with zero");
        for &byte in &encoded[..encoded.len() - 1] {
            assert_ne!(byte, 0, "COBS encoded data should not contain zeros");
        }

        let decoded = cobs_decode(&encoded).expect("Should decode");
        assert_eq!(decoded.as_slice(), &data_with_zeros);
    }
}

//! Serial command reader
//!
//! Accumulates bytes into COBS frames, decodes them and parses commands.
//! The byte source is up to the caller so the same reader serves any
//! serial transport.

use crate::commands::parser::CommandParser;
use crate::commands::serialiser::cobs_decode;
use crate::commands::types::{Command, ResponseStatus};
use crate::config::protocol::{FRAME_DELIMITER, MAX_FRAME_SIZE};
use heapless::Vec;

/// Outcome of a completed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    /// Successfully parsed a command
    Command(Command),
    /// Parse error with the command id byte, if the frame had one
    ParseError(ResponseStatus, u8),
}

/// Accumulates incoming bytes and extracts complete COBS frames.
///
/// Frames are delimited by zero bytes. A frame longer than
/// [`MAX_FRAME_SIZE`] is dropped whole.
pub struct FrameAccumulator {
    buffer: Vec<u8, MAX_FRAME_SIZE>,
    overflowed: bool,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Push a byte; returns the frame, delimiter included, once complete
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8, MAX_FRAME_SIZE>> {
        if byte == FRAME_DELIMITER {
            let overflowed = core::mem::replace(&mut self.overflowed, false);
            if self.buffer.is_empty() || overflowed {
                self.buffer.clear();
                return None;
            }
            let mut frame = core::mem::take(&mut self.buffer);
            // corncobs::decode_buf expects the delimiter
            if frame.push(FRAME_DELIMITER).is_err() {
                return None;
            }
            return Some(frame);
        }

        // Keep one byte free for the delimiter
        if self.overflowed || self.buffer.len() + 1 >= MAX_FRAME_SIZE {
            self.buffer.clear();
            self.overflowed = true;
            return None;
        }
        let _ = self.buffer.push(byte);
        None
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Serial command reader
pub struct CommandReader {
    accumulator: FrameAccumulator,
    parser: CommandParser,
    sequence_counter: u16,
}

impl CommandReader {
    pub fn new() -> Self {
        Self {
            accumulator: FrameAccumulator::new(),
            parser: CommandParser::new(),
            sequence_counter: 0,
        }
    }

    /// Get the next sequence ID
    pub fn next_sequence_id(&mut self) -> u16 {
        let id = self.sequence_counter;
        self.sequence_counter = self.sequence_counter.wrapping_add(1);
        id
    }

    /// Feed one received byte.
    ///
    /// Returns a result when the byte completes a frame. Frames that fail
    /// COBS decoding are dropped silently.
    pub fn push(&mut self, byte: u8) -> Option<ReadResult> {
        let frame = self.accumulator.push(byte)?;
        self.process_frame(&frame)
    }

    /// Feed a chunk of bytes, calling `on_result` for every completed frame
    pub fn push_all<F: FnMut(ReadResult)>(&mut self, bytes: &[u8], mut on_result: F) {
        for &byte in bytes {
            if let Some(result) = self.push(byte) {
                on_result(result);
            }
        }
    }

    fn process_frame(&self, frame: &[u8]) -> Option<ReadResult> {
        let decoded = match cobs_decode(frame) {
            Ok(d) => d,
            Err(()) => {
                log::warn!("Dropping frame with invalid COBS encoding");
                return None;
            }
        };

        if decoded.is_empty() {
            return None;
        }

        // Byte 0 is the protocol version
        let command_id = decoded.get(1).copied().unwrap_or(0);

        match self.parser.parse(&decoded) {
            Ok(cmd) => Some(ReadResult::Command(cmd)),
            Err(status) => Some(ReadResult::ParseError(status, command_id)),
        }
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.accumulator.reset();
    }
}

impl Default for CommandReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::parser::calculate_crc;
    use crate::config::protocol::PROTOCOL_VERSION;

    /// Build a complete COBS-encoded frame for a command
    fn build_test_frame(version: u8, cmd_id: u8, payload: &[u8], corrupt_crc: bool) -> std::vec::Vec<u8> {
        let mut raw = std::vec![version, cmd_id];
        raw.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        raw.extend_from_slice(payload);
        let mut crc = calculate_crc(&raw);
        if corrupt_crc {
            crc ^= 0xFFFF;
        }
        raw.extend_from_slice(&crc.to_le_bytes());

        let mut encoded = std::vec![0u8; corncobs::max_encoded_len(raw.len())];
        let len = corncobs::encode_buf(&raw, &mut encoded);
        encoded.truncate(len);
        encoded
    }

    fn frame(cmd_id: u8, payload: &[u8]) -> std::vec::Vec<u8> {
        build_test_frame(PROTOCOL_VERSION, cmd_id, payload, false)
    }

    fn read_all(reader: &mut CommandReader, bytes: &[u8]) -> std::vec::Vec<ReadResult> {
        let mut results = std::vec::Vec::new();
        reader.push_all(bytes, |r| results.push(r));
        results
    }

    #[test]
    fn test_read_get_version() {
        let mut reader = CommandReader::new();
        assert_eq!(
            read_all(&mut reader, &frame(0x01, &[])),
            [ReadResult::Command(Command::GetVersion)]
        );
    }

    #[test]
    fn test_read_set_transmitter_id() {
        let mut reader = CommandReader::new();
        // Payload contains a zero byte, exercising COBS
        assert_eq!(
            read_all(&mut reader, &frame(0x03, &[0x00, 0x01])),
            [ReadResult::Command(Command::SetTransmitterId { id: 256 })]
        );
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut reader = CommandReader::new();
        let mut bytes = frame(0x01, &[]);
        bytes.extend(frame(0x13, &[0x02, 0x00]));

        assert_eq!(
            read_all(&mut reader, &bytes),
            [
                ReadResult::Command(Command::GetVersion),
                ReadResult::Command(Command::GetLogEntry { index: 2 }),
            ]
        );
    }

    #[test]
    fn test_crc_error_reports_command_id() {
        let mut reader = CommandReader::new();
        let bytes = build_test_frame(PROTOCOL_VERSION, 0x12, &[], true);
        assert_eq!(
            read_all(&mut reader, &bytes),
            [ReadResult::ParseError(ResponseStatus::CrcError, 0x12)]
        );
    }

    #[test]
    fn test_wrong_version_reported() {
        let mut reader = CommandReader::new();
        let bytes = build_test_frame(0x09, 0x01, &[], false);
        assert_eq!(
            read_all(&mut reader, &bytes),
            [ReadResult::ParseError(ResponseStatus::InvalidVersion, 0x01)]
        );
    }

    #[test]
    fn test_oversized_frame_dropped() {
        let mut reader = CommandReader::new();
        let junk = [0x55u8; MAX_FRAME_SIZE + 10];
        assert!(read_all(&mut reader, &junk).is_empty());
        assert!(reader.push(0x00).is_none());

        // The next frame is read normally
        assert_eq!(
            read_all(&mut reader, &frame(0x02, &[])),
            [ReadResult::Command(Command::GetSettings)]
        );
    }

    #[test]
    fn test_empty_frames_ignored() {
        let mut reader = CommandReader::new();
        assert!(read_all(&mut reader, &[0x00, 0x00, 0x00]).is_empty());
    }

    #[test]
    fn test_sequence_id() {
        let mut reader = CommandReader::new();

        assert_eq!(reader.next_sequence_id(), 0);
        assert_eq!(reader.next_sequence_id(), 1);
        assert_eq!(reader.next_sequence_id(), 2);
    }
}

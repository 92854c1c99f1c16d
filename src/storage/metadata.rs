//! Device metadata: name, transmitter id, power save flag
//!
//! These fields live behind the slot table in the same store but are
//! trusted field by field. An invalid field falls back to its compiled-in
//! default and is reported, it never blocks boot.

use heapless::{String, Vec};

use crate::config::identity::{
    DEFAULT_DEVICE_NAME, DEFAULT_POWER_SAVE, DEFAULT_TRANSMITTER_ID, DEVICE_NAME_FIELD_LEN,
    MAX_DEVICE_NAME_LEN,
};
use crate::config::storage::TRANSMITTER_ID_ABSENT;

/// Device name storage
pub type DeviceName = String<MAX_DEVICE_NAME_LEN>;

/// Metadata field that fell back to its default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    DeviceName,
    TransmitterId,
    PowerMode,
}

/// Fields that were replaced by defaults during load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataReport {
    fallbacks: Vec<MetadataField, 3>,
}

impl MetadataReport {
    pub(crate) fn fell_back(&mut self, field: MetadataField) {
        let _ = self.fallbacks.push(field);
    }

    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }

    pub fn contains(&self, field: MetadataField) -> bool {
        self.fallbacks.contains(&field)
    }

    pub fn fallbacks(&self) -> &[MetadataField] {
        &self.fallbacks
    }
}

/// Reasons a device name is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong,
    /// Contains a byte outside printable ASCII
    NotPrintable,
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

/// Check a name the operator wants to set
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_DEVICE_NAME_LEN {
        return Err(NameError::TooLong);
    }
    if !name.bytes().all(is_printable) {
        return Err(NameError::NotPrintable);
    }
    Ok(())
}

/// Decode the stored name field.
///
/// The name runs to the first NUL. An empty name, an erased first byte or
/// any non-printable byte makes the field invalid. A field without
/// terminator is cut to the usable length.
pub fn decode_name(field: &[u8; DEVICE_NAME_FIELD_LEN]) -> Option<DeviceName> {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let bytes = &field[..len];
    if bytes.is_empty() || !bytes.iter().all(|&b| is_printable(b)) {
        return None;
    }
    let bytes = &bytes[..bytes.len().min(MAX_DEVICE_NAME_LEN)];
    // Printable ASCII is valid UTF-8
    let text = core::str::from_utf8(bytes).ok()?;
    let mut name = DeviceName::new();
    name.push_str(text).ok()?;
    Some(name)
}

/// NUL-padded name field
pub fn encode_name(name: &str) -> [u8; DEVICE_NAME_FIELD_LEN] {
    let mut field = [0u8; DEVICE_NAME_FIELD_LEN];
    let len = name.len().min(MAX_DEVICE_NAME_LEN);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    field
}

/// `None` for the erased sentinel
pub fn decode_transmitter_id(raw: [u8; 2]) -> Option<u16> {
    match u16::from_le_bytes(raw) {
        TRANSMITTER_ID_ABSENT => None,
        id => Some(id),
    }
}

/// Only 0 and 1 are valid flag values
pub fn decode_power_mode(raw: u8) -> Option<bool> {
    match raw {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

/// Operator-editable device settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMetadata {
    name: DeviceName,
    transmitter_id: u16,
    power_save: bool,
}

impl DeviceMetadata {
    pub fn new(name: &str, transmitter_id: u16, power_save: bool) -> Result<Self, NameError> {
        let mut metadata = Self::default();
        metadata.set_name(name)?;
        metadata.transmitter_id = transmitter_id;
        metadata.power_save = power_save;
        Ok(metadata)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transmitter_id(&self) -> u16 {
        self.transmitter_id
    }

    pub fn power_save(&self) -> bool {
        self.power_save
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), NameError> {
        validate_name(name)?;
        let mut stored = DeviceName::new();
        stored.push_str(name).map_err(|_| NameError::TooLong)?;
        self.name = stored;
        Ok(())
    }

    pub fn set_transmitter_id(&mut self, id: u16) {
        self.transmitter_id = id;
    }

    pub fn set_power_save(&mut self, enabled: bool) {
        self.power_save = enabled;
    }

    pub(crate) fn with_name(&mut self, name: DeviceName) {
        self.name = name;
    }
}

impl Default for DeviceMetadata {
    fn default() -> Self {
        let mut name = DeviceName::new();
        let _ = name.push_str(DEFAULT_DEVICE_NAME);
        Self {
            name,
            transmitter_id: DEFAULT_TRANSMITTER_ID,
            power_save: DEFAULT_POWER_SAVE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(text: &[u8]) -> [u8; DEVICE_NAME_FIELD_LEN] {
        let mut field = [0u8; DEVICE_NAME_FIELD_LEN];
        field[..text.len()].copy_from_slice(text);
        field
    }

    #[test]
    fn test_decode_valid_name() {
        let name = decode_name(&field(b"Trailer 3 rear")).unwrap();
        assert_eq!(name.as_str(), "Trailer 3 rear");
    }

    #[test]
    fn test_decode_erased_name_invalid() {
        assert!(decode_name(&[0xFF; DEVICE_NAME_FIELD_LEN]).is_none());
        assert!(decode_name(&[0x00; DEVICE_NAME_FIELD_LEN]).is_none());
    }

    #[test]
    fn test_decode_control_char_invalid() {
        assert!(decode_name(&field(b"abc\x07def")).is_none());
    }

    #[test]
    fn test_decode_unterminated_name_truncated() {
        let name = decode_name(&[b'A'; DEVICE_NAME_FIELD_LEN]).unwrap();
        assert_eq!(name.len(), MAX_DEVICE_NAME_LEN);
    }

    #[test]
    fn test_encode_name_pads_with_nul() {
        let encoded = encode_name("TX-7");
        assert_eq!(&encoded[..5], b"TX-7\0");
        assert!(encoded[4..].iter().all(|&b| b == 0));
        assert_eq!(decode_name(&encoded).unwrap().as_str(), "TX-7");
    }

    #[test]
    fn test_transmitter_id_sentinel() {
        assert_eq!(decode_transmitter_id([0xFF, 0xFF]), None);
        assert_eq!(decode_transmitter_id([0x00, 0x00]), Some(0));
        assert_eq!(decode_transmitter_id([0xFE, 0xFF]), Some(0xFFFE));
    }

    #[test]
    fn test_power_mode_domain() {
        assert_eq!(decode_power_mode(0), Some(false));
        assert_eq!(decode_power_mode(1), Some(true));
        assert_eq!(decode_power_mode(0xFF), None);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name(""), Err(NameError::Empty));
        assert_eq!(validate_name("tab\there"), Err(NameError::NotPrintable));
        assert_eq!(validate_name("ü"), Err(NameError::NotPrintable));
        let long = "x".repeat(MAX_DEVICE_NAME_LEN + 1);
        assert_eq!(validate_name(&long), Err(NameError::TooLong));
        assert!(validate_name("AxleWatch North").is_ok());
    }

    #[test]
    fn test_defaults() {
        let metadata = DeviceMetadata::default();
        assert_eq!(metadata.name(), "AxleWatch-TX");
        assert_eq!(metadata.transmitter_id(), 1);
        assert!(!metadata.power_save());
    }
}

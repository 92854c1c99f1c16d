//! Persisted record layout
//!
//! Every field of the record is described once here and both the encode
//! and the decode path go through these descriptors.
//!
//! ```text
//! offset  width  field
//! 0       2      magic (u16 LE, 0xABCD)
//! 2       2      reserved
//! 4       80     slot table (10 x 8-byte address)
//! 84      1      active count
//! 85      3      reserved
//! 88      32     device name (NUL terminated)
//! 120     2      transmitter id (u16 LE, 0xFFFF = absent)
//! 122     1      power save flag (0/1)
//! ```

use crate::config::identity::DEVICE_NAME_FIELD_LEN;
use crate::config::slots::{ADDRESS_LEN, MAX_SLOTS};
use crate::config::storage::STORE_SIZE;
use crate::storage::traits::{Storage, StorageError};

/// One fixed-width field of the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    /// First offset past the field
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Read the whole field into an array of exactly its width
    pub fn read<const N: usize, S: Storage>(&self, storage: &mut S) -> Result<[u8; N], StorageError> {
        if N != self.width {
            return Err(StorageError::OutOfBounds);
        }
        let mut buf = [0u8; N];
        storage.read(self.offset, &mut buf)?;
        Ok(buf)
    }

    /// Stage the whole field; `data` must be exactly its width
    pub fn write<S: Storage>(&self, storage: &mut S, data: &[u8]) -> Result<(), StorageError> {
        if data.len() != self.width {
            return Err(StorageError::OutOfBounds);
        }
        storage.write(self.offset, data)
    }
}

pub const MAGIC: Field = Field::new("magic", 0, 2);
pub const SLOT_TABLE: Field = Field::new("slot_table", 4, MAX_SLOTS * ADDRESS_LEN);
pub const ACTIVE_COUNT: Field = Field::new("active_count", 84, 1);
pub const DEVICE_NAME: Field = Field::new("device_name", 88, DEVICE_NAME_FIELD_LEN);
pub const TRANSMITTER_ID: Field = Field::new("transmitter_id", 120, 2);
pub const POWER_MODE: Field = Field::new("power_mode", 122, 1);

/// All fields in offset order
pub const FIELDS: [Field; 6] = [
    MAGIC,
    SLOT_TABLE,
    ACTIVE_COUNT,
    DEVICE_NAME,
    TRANSMITTER_ID,
    POWER_MODE,
];

/// Bytes occupied by the record
pub const RECORD_LEN: usize = POWER_MODE.end();

const _: () = assert!(RECORD_LEN <= STORE_SIZE);

/// Sub-field of the slot table holding slot `index`
pub const fn slot(index: usize) -> Field {
    Field::new("slot", SLOT_TABLE.offset + index * ADDRESS_LEN, ADDRESS_LEN)
}

//! Bus device address

use core::fmt;

use crate::config::slots::ADDRESS_LEN;

/// 8-byte address of a probe on the bus.
///
/// Addresses are opaque: they are compared byte for byte and never
/// decoded into family code or serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddress([u8; ADDRESS_LEN]);

impl DeviceAddress {
    /// All-zero address, written for unassigned slots
    pub const ZERO: Self = Self([0; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice, `None` if the length is wrong
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ADDRESS_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for DeviceAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

/// Colon separated upper-case hex, e.g. `28:FF:64:1E:0F:16:03:9A`
impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

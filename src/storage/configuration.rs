//! Slot mapping
//!
//! Slot 0 is the ambient probe, slots 1..=9 are optional positions. Slots
//! are filled strictly in order, so the assigned slots are always the
//! prefix `[0, active_count)`.

use core::fmt;

use crate::config::slots::{AMBIENT_SLOT, MAX_SLOTS};
use crate::sensors::DeviceAddress;

/// Two slots holding the same address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicatePair {
    pub first: u8,
    pub second: u8,
}

impl fmt::Display for DuplicatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slots {} and {}", self.first, self.second)
    }
}

/// Errors from mutating a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Slot index is not the next free slot
    OutOfOrder { slot: u8, active_count: u8 },
    /// Address already claimed by an earlier slot
    Duplicate { slot: u8, claimed_by: u8 },
    /// Active count outside the allowed range
    InvalidActiveCount(u8),
}

/// Ordered slot table plus the number of assigned slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    slots: [Option<DeviceAddress>; MAX_SLOTS],
    active_count: u8,
}

impl Configuration {
    /// Safe default used when nothing trustworthy is stored.
    ///
    /// Counts one slot so telemetry framing stays well formed, but the
    /// ambient slot holds no address; the device is unconfigured.
    pub const fn unconfigured() -> Self {
        Self {
            slots: [None; MAX_SLOTS],
            active_count: 1,
        }
    }

    /// Empty table a setup run starts from
    pub const fn cleared() -> Self {
        Self {
            slots: [None; MAX_SLOTS],
            active_count: 0,
        }
    }

    /// Build a configuration from the addresses of slots `0..addresses.len()`.
    ///
    /// Fails on duplicates or more than [`MAX_SLOTS`] addresses.
    pub fn from_addresses(addresses: &[DeviceAddress]) -> Result<Self, ConfigError> {
        if addresses.len() > MAX_SLOTS {
            return Err(ConfigError::InvalidActiveCount(addresses.len() as u8));
        }
        let mut config = Self::cleared();
        for (slot, address) in addresses.iter().enumerate() {
            config.assign(slot as u8, *address)?;
        }
        Ok(config)
    }

    /// Assign the next free slot.
    ///
    /// `slot` must equal the current active count and `address` must not be
    /// claimed by any earlier slot.
    pub fn assign(&mut self, slot: u8, address: DeviceAddress) -> Result<(), ConfigError> {
        if slot != self.active_count || slot as usize >= MAX_SLOTS {
            return Err(ConfigError::OutOfOrder {
                slot,
                active_count: self.active_count,
            });
        }
        if let Some(claimed_by) = self.claimed_by(&address, slot) {
            return Err(ConfigError::Duplicate { slot, claimed_by });
        }
        self.slots[slot as usize] = Some(address);
        self.active_count = slot + 1;
        Ok(())
    }

    pub fn active_count(&self) -> u8 {
        self.active_count
    }

    /// Address in `slot`, `None` if unassigned or past the active count
    pub fn slot(&self, slot: usize) -> Option<DeviceAddress> {
        if slot < self.active_count as usize {
            self.slots.get(slot).copied().flatten()
        } else {
            None
        }
    }

    pub fn ambient(&self) -> Option<DeviceAddress> {
        self.slot(AMBIENT_SLOT)
    }

    /// Whether every counted slot holds an address
    pub fn is_complete(&self) -> bool {
        self.active_count >= 1 && (0..self.active_count as usize).all(|i| self.slot(i).is_some())
    }

    /// Assigned `(slot, address)` pairs in slot order
    pub fn assigned(&self) -> impl Iterator<Item = (usize, DeviceAddress)> + '_ {
        (0..self.active_count as usize).filter_map(move |i| self.slot(i).map(|a| (i, a)))
    }

    /// First slot before `before_slot` already holding `address`
    fn claimed_by(&self, address: &DeviceAddress, before_slot: u8) -> Option<u8> {
        let limit = before_slot.min(self.active_count) as usize;
        (0..limit)
            .find(|&i| self.slots[i].as_ref() == Some(address))
            .map(|i| i as u8)
    }

    /// True iff `address` is assigned to one of the slots `[0, before_slot)`
    pub fn is_duplicate(&self, address: &DeviceAddress, before_slot: u8) -> bool {
        self.claimed_by(address, before_slot).is_some()
    }

    /// Pairwise check of the counted slots; returns the first collision
    pub fn validate_unique(&self) -> Option<DuplicatePair> {
        let count = (self.active_count as usize).min(MAX_SLOTS);
        for i in 0..count {
            let Some(a) = self.slots[i] else { continue };
            for j in (i + 1)..count {
                if self.slots[j] == Some(a) {
                    return Some(DuplicatePair {
                        first: i as u8,
                        second: j as u8,
                    });
                }
            }
        }
        None
    }

    /// Rebuild from raw stored slot bytes without any checks.
    ///
    /// Used by the store decoder, which validates afterwards.
    pub(crate) fn from_raw(raw: &[DeviceAddress; MAX_SLOTS], active_count: u8) -> Self {
        let mut slots = [None; MAX_SLOTS];
        let count = (active_count as usize).min(MAX_SLOTS);
        for (slot, address) in slots.iter_mut().zip(raw.iter()).take(count) {
            *slot = Some(*address);
        }
        Self {
            slots,
            active_count,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::unconfigured()
    }
}

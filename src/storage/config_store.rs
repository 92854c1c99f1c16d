//! Configuration store
//!
//! Encodes the slot mapping and device metadata into the persisted record
//! described in [`crate::storage::layout`] and decodes it again at boot.
//! The slot table is trusted only behind the magic marker; metadata fields
//! are checked one by one.

use crate::config::slots::{ADDRESS_LEN, MAX_SLOTS};
use crate::config::storage::MAGIC;
use crate::sensors::DeviceAddress;
use crate::storage::configuration::{Configuration, DuplicatePair};
use crate::storage::layout;
use crate::storage::metadata::{
    decode_name, decode_power_mode, decode_transmitter_id, encode_name, DeviceMetadata,
    MetadataField, MetadataReport,
};
use crate::storage::traits::{Storage, StorageError};

/// Why the stored slot table was not trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntrustedReason {
    /// Marker missing: never configured or erased
    MagicMismatch(u16),
    /// Marker present but the count is outside `[1, 10]`
    ActiveCountOutOfRange(u8),
    /// The store could not be read
    ReadFailed(StorageError),
}

/// Outcome of loading the slot table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// A valid configuration was loaded
    Configured,
    /// Nothing trustworthy stored; the safe default is in use
    Untrusted(UntrustedReason),
    /// Marker matched but two slots share an address; the safe default is in use
    Corrupt(DuplicatePair),
}

impl LoadStatus {
    pub fn is_configured(&self) -> bool {
        matches!(self, LoadStatus::Configured)
    }
}

/// Configuration plus how it was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedConfiguration {
    pub configuration: Configuration,
    pub status: LoadStatus,
}

impl LoadedConfiguration {
    fn fallback(status: LoadStatus) -> Self {
        Self {
            configuration: Configuration::unconfigured(),
            status,
        }
    }
}

/// Errors from [`ConfigStore::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveError {
    /// Refused: the configuration has no ambient slot or an empty slot
    Incomplete,
    /// Refused: two slots share an address
    Duplicate(DuplicatePair),
    /// The store failed
    Storage(StorageError),
}

impl From<StorageError> for SaveError {
    fn from(error: StorageError) -> Self {
        SaveError::Storage(error)
    }
}

/// Persisted configuration record on top of a [`Storage`]
pub struct ConfigStore<S: Storage> {
    storage: S,
}

impl<S: Storage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Load the slot mapping, falling back to the safe default.
    pub fn load(&mut self) -> LoadedConfiguration {
        match self.decode() {
            Ok(Ok(configuration)) => {
                log::info!(
                    "Configuration loaded: {} sensors",
                    configuration.active_count()
                );
                for (slot, address) in configuration.assigned() {
                    log::info!("  slot {}: {}", slot, address);
                }
                LoadedConfiguration {
                    configuration,
                    status: LoadStatus::Configured,
                }
            }
            Ok(Err(pair)) => {
                log::warn!(
                    "Stored configuration has duplicate sensors in {}, setup required",
                    pair
                );
                LoadedConfiguration::fallback(LoadStatus::Corrupt(pair))
            }
            Err(reason) => {
                match reason {
                    UntrustedReason::MagicMismatch(_) => {
                        log::info!("No valid configuration found, setup required")
                    }
                    UntrustedReason::ActiveCountOutOfRange(count) => {
                        log::warn!("Invalid stored sensor count ({}), setup required", count)
                    }
                    UntrustedReason::ReadFailed(error) => {
                        log::error!("Reading configuration failed: {:?}", error)
                    }
                }
                LoadedConfiguration::fallback(LoadStatus::Untrusted(reason))
            }
        }
    }

    fn decode(&mut self) -> Result<Result<Configuration, DuplicatePair>, UntrustedReason> {
        let magic: [u8; 2] = layout::MAGIC
            .read(&mut self.storage)
            .map_err(UntrustedReason::ReadFailed)?;
        let magic = u16::from_le_bytes(magic);
        if magic != MAGIC {
            return Err(UntrustedReason::MagicMismatch(magic));
        }

        let [active_count]: [u8; 1] = layout::ACTIVE_COUNT
            .read(&mut self.storage)
            .map_err(UntrustedReason::ReadFailed)?;
        if active_count < 1 || active_count as usize > MAX_SLOTS {
            return Err(UntrustedReason::ActiveCountOutOfRange(active_count));
        }

        let table: [u8; MAX_SLOTS * ADDRESS_LEN] = layout::SLOT_TABLE
            .read(&mut self.storage)
            .map_err(UntrustedReason::ReadFailed)?;
        let mut raw = [DeviceAddress::ZERO; MAX_SLOTS];
        for (address, chunk) in raw.iter_mut().zip(table.chunks_exact(ADDRESS_LEN)) {
            if let Some(decoded) = DeviceAddress::from_slice(chunk) {
                *address = decoded;
            }
        }

        let configuration = Configuration::from_raw(&raw, active_count);
        Ok(match Self::validate_unique(&configuration) {
            Some(pair) => Err(pair),
            None => Ok(configuration),
        })
    }

    /// Persist the slot mapping and commit.
    ///
    /// The configuration must be complete and unique; anything else is
    /// refused without touching the store.
    pub fn save(&mut self, configuration: &Configuration) -> Result<(), SaveError> {
        if !configuration.is_complete() {
            return Err(SaveError::Incomplete);
        }
        if let Some(pair) = Self::validate_unique(configuration) {
            return Err(SaveError::Duplicate(pair));
        }

        let mut table = [0u8; MAX_SLOTS * ADDRESS_LEN];
        for (slot, address) in configuration.assigned() {
            let start = slot * ADDRESS_LEN;
            table[start..start + ADDRESS_LEN].copy_from_slice(address.as_bytes());
        }

        let active_count = configuration.active_count();
        self.transaction(|storage| {
            layout::MAGIC.write(storage, &MAGIC.to_le_bytes())?;
            layout::SLOT_TABLE.write(storage, &table)?;
            layout::ACTIVE_COUNT.write(storage, &[active_count])
        })?;

        log::info!("Configuration saved: {} sensors", active_count);
        Ok(())
    }

    /// True iff `address` is assigned in `configuration` before `before_slot`
    pub fn is_duplicate(
        configuration: &Configuration,
        address: &DeviceAddress,
        before_slot: u8,
    ) -> bool {
        configuration.is_duplicate(address, before_slot)
    }

    /// First pair of counted slots sharing an address
    pub fn validate_unique(configuration: &Configuration) -> Option<DuplicatePair> {
        configuration.validate_unique()
    }

    /// Load name, transmitter id and power flag with per-field fallback.
    pub fn load_metadata(&mut self) -> (DeviceMetadata, MetadataReport) {
        let mut metadata = DeviceMetadata::default();
        let mut report = MetadataReport::default();

        match layout::DEVICE_NAME
            .read(&mut self.storage)
            .ok()
            .and_then(|field| decode_name(&field))
        {
            Some(name) => {
                log::info!("Loaded device name: {}", name);
                metadata.with_name(name);
            }
            None => {
                log::info!("No valid device name stored, using default");
                report.fell_back(MetadataField::DeviceName);
            }
        }

        match layout::TRANSMITTER_ID
            .read(&mut self.storage)
            .ok()
            .and_then(decode_transmitter_id)
        {
            Some(id) => metadata.set_transmitter_id(id),
            None => {
                log::info!(
                    "No transmitter ID stored, using default ({})",
                    metadata.transmitter_id()
                );
                report.fell_back(MetadataField::TransmitterId);
            }
        }

        match layout::POWER_MODE
            .read::<1, _>(&mut self.storage)
            .ok()
            .and_then(|[raw]| decode_power_mode(raw))
        {
            Some(enabled) => metadata.set_power_save(enabled),
            None => {
                log::info!("Invalid power mode stored, using default (off)");
                report.fell_back(MetadataField::PowerMode);
            }
        }

        log::info!(
            "Loaded transmitter config: ID {}, power save: {}",
            metadata.transmitter_id(),
            if metadata.power_save() { "ON" } else { "OFF" }
        );
        (metadata, report)
    }

    /// Persist the device name and commit
    pub fn save_device_name(&mut self, name: &str) -> Result<(), StorageError> {
        let field = encode_name(name);
        self.transaction(|storage| layout::DEVICE_NAME.write(storage, &field))?;
        log::info!("Device name saved");
        Ok(())
    }

    /// Persist transmitter id and power flag and commit
    pub fn save_transmitter(&mut self, id: u16, power_save: bool) -> Result<(), StorageError> {
        self.transaction(|storage| {
            layout::TRANSMITTER_ID.write(storage, &id.to_le_bytes())?;
            layout::POWER_MODE.write(storage, &[power_save as u8])
        })?;
        log::info!(
            "Transmitter ID {} saved (power save: {})",
            id,
            if power_save { "ON" } else { "OFF" }
        );
        Ok(())
    }

    /// Stage writes and commit them as one unit.
    ///
    /// Any failure discards the staged bytes so a later commit cannot make
    /// them durable.
    fn transaction<F>(&mut self, stage: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut S) -> Result<(), StorageError>,
    {
        let result = stage(&mut self.storage).and_then(|()| self.storage.commit());
        if let Err(e) = result {
            log::warn!("Store update failed ({:?}), discarding staged writes", e);
            if let Err(discard) = self.storage.discard() {
                log::error!("Discarding staged writes failed: {:?}", discard);
            }
        }
        result
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

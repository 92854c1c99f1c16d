//! Persistent configuration: slot mapping, device metadata and their
//! on-storage layout

pub mod config_store;
pub mod configuration;
pub mod layout;
pub mod metadata;
pub mod traits;

pub use config_store::{ConfigStore, LoadStatus, LoadedConfiguration, SaveError, UntrustedReason};
pub use configuration::{ConfigError, Configuration, DuplicatePair};
pub use metadata::{DeviceMetadata, DeviceName, MetadataField, MetadataReport, NameError};
pub use traits::{Storage, StorageError};

//! Command dispatcher
//!
//! Executes parsed commands against the [`Device`] and builds the response.
//! Every command is answered synchronously; `EnterSetup` only raises the
//! request and the main loop picks it up on its next iteration.

use crate::commands::types::{Command, CommandId, Response, ResponseStatus};
use crate::config::protocol;
use crate::device::{Device, SettingsError};
use crate::storage::Storage;

/// Command dispatcher
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Create a new command dispatcher
    pub fn new() -> Self {
        Self
    }

    /// Dispatch a command and return the response
    pub fn dispatch<S: Storage>(&self, device: &mut Device<S>, command: Command) -> Response {
        let id = command.id();
        match command {
            Command::GetVersion => self.handle_get_version(),
            Command::GetSettings => Response::Settings(device.settings()),
            Command::SetTransmitterId { id: transmitter_id } => {
                self.settings_result(device, id, |d| d.set_identity(transmitter_id))
            }
            Command::SetPowerMode { enabled } => {
                self.settings_result(device, id, |d| d.set_power_mode(enabled))
            }
            Command::SetDeviceName { name } => {
                self.settings_result(device, id, |d| d.set_device_name(&name))
            }
            Command::EnterSetup => {
                device.request_enter_setup();
                Response::Ack
            }
            Command::GetConfiguration => Response::Configuration(device.current_configuration()),
            Command::GetReading => Response::Reading {
                reading: device.current_reading(),
                active_count: device.current_configuration().configuration.active_count(),
            },
            Command::GetStats => Response::Stats(device.transmission_stats()),
            Command::GetLogEntry { index } => self.handle_get_log_entry(device, index),
        }
    }

    fn handle_get_version(&self) -> Response {
        log::debug!(
            "Version requested. Responding {}.{}.{}",
            protocol::VERSION_MAJOR,
            protocol::VERSION_MINOR,
            protocol::VERSION_PATCH
        );
        Response::Version {
            major: protocol::VERSION_MAJOR,
            minor: protocol::VERSION_MINOR,
            patch: protocol::VERSION_PATCH,
        }
    }

    /// Apply a setter and answer with the settings now in effect
    fn settings_result<S, F>(&self, device: &mut Device<S>, id: CommandId, apply: F) -> Response
    where
        S: Storage,
        F: FnOnce(&mut Device<S>) -> Result<(), SettingsError>,
    {
        match apply(device) {
            Ok(()) => Response::Settings(device.settings()),
            Err(e) => {
                log::warn!("Command {:?} failed: {:?}", id, e);
                Response::error(Self::settings_status(e), id)
            }
        }
    }

    fn settings_status(error: SettingsError) -> ResponseStatus {
        match error {
            SettingsError::InvalidName(_) => ResponseStatus::InvalidValue,
            SettingsError::Storage(_) => ResponseStatus::StorageError,
        }
    }

    fn handle_get_log_entry<S: Storage>(&self, device: &Device<S>, index: u16) -> Response {
        match device.log_entry(index as usize) {
            Some(entry) => Response::LogEntry {
                index,
                total: device.log_count().min(u16::MAX as usize) as u16,
                entry: entry.clone(),
            },
            None => Response::error(ResponseStatus::NotFound, CommandId::GetLogEntry),
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

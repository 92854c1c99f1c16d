//! Device state and main loop step
//!
//! [`Device`] owns everything that persists across loop iterations: the
//! store, the active configuration, metadata, the scheduler, the setup
//! machine and the operator log. Hardware collaborators are passed into
//! each call by the board's loop, so the device never touches a global.

use crate::clock::Clock;
use crate::config::timing;
use crate::logbuf::{LogBuffer, LogEntry};
use crate::panel::{Button, Feedback, HoldDetector, Pattern};
use crate::power::PowerControl;
use crate::radio::Radio;
use crate::sensors::TemperatureBus;
use crate::setup::{run_setup, SetupOutcome, SetupStateMachine, SetupTiming};
use crate::storage::{
    ConfigStore, Configuration, DeviceMetadata, DeviceName, LoadStatus, MetadataReport, NameError,
    Storage, StorageError,
};
use crate::telemetry::{
    CycleOutcome, Reading, SchedulerConfig, TelemetryError, TransmissionStats, TransmitScheduler,
};

/// Slot mapping plus how it came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationSnapshot {
    pub configuration: Configuration,
    /// True once a stored or freshly saved configuration is in use
    pub configured: bool,
    /// Outcome of the boot-time load
    pub status: LoadStatus,
}

/// Operator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub name: DeviceName,
    pub transmitter_id: u16,
    pub power_save: bool,
    pub configured: bool,
    pub active_count: u8,
}

/// Errors from changing a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    InvalidName(NameError),
    /// Persisting failed; the previous value is still in effect
    Storage(StorageError),
}

impl From<StorageError> for SettingsError {
    fn from(error: StorageError) -> Self {
        SettingsError::Storage(error)
    }
}

impl From<NameError> for SettingsError {
    fn from(error: NameError) -> Self {
        SettingsError::InvalidName(error)
    }
}

/// Tunables for the device loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceOptions {
    pub setup: SetupTiming,
    pub scheduler: SchedulerConfig,
    /// Hold that enters setup during normal operation
    pub setup_hold_ms: u32,
    pub heartbeat_interval_ms: u32,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            setup: SetupTiming::default(),
            scheduler: SchedulerConfig::default(),
            setup_hold_ms: timing::SETUP_HOLD_MS,
            heartbeat_interval_ms: timing::HEARTBEAT_INTERVAL_MS,
        }
    }
}

/// What one [`Device::service`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// Nothing due
    Idle,
    Setup(SetupOutcome),
    Transmitted(CycleOutcome),
    TransmitFailed(TelemetryError),
}

pub struct Device<S: Storage> {
    options: DeviceOptions,
    store: ConfigStore<S>,
    configuration: Configuration,
    load_status: LoadStatus,
    configured: bool,
    metadata: DeviceMetadata,
    metadata_report: MetadataReport,
    scheduler: TransmitScheduler,
    setup: SetupStateMachine,
    setup_hold: HoldDetector,
    setup_requested: bool,
    logs: LogBuffer,
    last_service_ms: u64,
    last_heartbeat_ms: u64,
}

impl<S: Storage> Device<S> {
    /// Load everything from `storage` and get ready for the first loop.
    ///
    /// A button held at boot requests setup on the first
    /// [`service`](Self::service) call.
    pub fn boot<P: Button + Feedback>(storage: S, options: DeviceOptions, panel: &mut P) -> Self {
        let mut store = ConfigStore::new(storage);
        let loaded = store.load();
        let (metadata, metadata_report) = store.load_metadata();

        let mut device = Self {
            options,
            store,
            configuration: loaded.configuration,
            load_status: loaded.status,
            configured: loaded.status.is_configured(),
            metadata,
            metadata_report,
            scheduler: TransmitScheduler::new(options.scheduler),
            setup: SetupStateMachine::new(options.setup),
            setup_hold: HoldDetector::new(options.setup_hold_ms),
            setup_requested: false,
            logs: LogBuffer::new(),
            last_service_ms: 0,
            last_heartbeat_ms: 0,
        };

        if let LoadStatus::Corrupt(pair) = loaded.status {
            device
                .logs
                .record(0, format_args!("Stored configuration corrupt ({}), setup required", pair));
            panel.signal(Pattern::ConfigCorrupt);
        }

        for field in device.metadata_report.fallbacks() {
            device
                .logs
                .record(0, format_args!("Stored {:?} invalid, using default", field));
        }

        if panel.is_pressed() {
            device
                .logs
                .record(0, format_args!("Button held at boot, entering setup"));
            device.setup_requested = true;
        }

        if device.configured {
            device.logs.record(
                0,
                format_args!(
                    "Ready: transmitter {}, {} sensors, power save {}",
                    device.metadata.transmitter_id(),
                    device.configuration.active_count(),
                    if device.metadata.power_save() { "ON" } else { "OFF" }
                ),
            );
            panel.signal(Pattern::Ready);
        } else {
            device
                .logs
                .record(0, format_args!("Sensors not configured, setup required"));
            panel.signal(Pattern::Unconfigured);
        }
        device
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn current_configuration(&self) -> ConfigurationSnapshot {
        ConfigurationSnapshot {
            configuration: self.configuration,
            configured: self.configured,
            status: self.load_status,
        }
    }

    pub fn current_reading(&self) -> Reading {
        *self.scheduler.reading()
    }

    pub fn transmission_stats(&self) -> TransmissionStats {
        *self.scheduler.stats()
    }

    pub fn settings(&self) -> Settings {
        let mut name = DeviceName::new();
        let _ = name.push_str(self.metadata.name());
        Settings {
            name,
            transmitter_id: self.metadata.transmitter_id(),
            power_save: self.metadata.power_save(),
            configured: self.configured,
            active_count: self.configuration.active_count(),
        }
    }

    /// Metadata fields that fell back to defaults at boot
    pub fn metadata_report(&self) -> &MetadataReport {
        &self.metadata_report
    }

    /// Run setup at the next [`service`](Self::service) call
    pub fn request_enter_setup(&mut self) {
        self.setup_requested = true;
    }

    pub fn setup_requested(&self) -> bool {
        self.setup_requested
    }

    /// Persist a new transmitter id
    pub fn set_identity(&mut self, transmitter_id: u16) -> Result<(), SettingsError> {
        self.store
            .save_transmitter(transmitter_id, self.metadata.power_save())?;
        self.metadata.set_transmitter_id(transmitter_id);
        let now = self.last_service_ms;
        self.logs
            .record(now, format_args!("Transmitter ID set to {}", transmitter_id));
        Ok(())
    }

    /// Persist the power save flag; takes effect after the next transmission
    pub fn set_power_mode(&mut self, power_save: bool) -> Result<(), SettingsError> {
        self.store
            .save_transmitter(self.metadata.transmitter_id(), power_save)?;
        self.metadata.set_power_save(power_save);
        let now = self.last_service_ms;
        self.logs.record(
            now,
            format_args!("Power save {}", if power_save { "ON" } else { "OFF" }),
        );
        Ok(())
    }

    /// Validate and persist a new device name
    pub fn set_device_name(&mut self, name: &str) -> Result<(), SettingsError> {
        let mut updated = self.metadata.clone();
        updated.set_name(name)?;
        self.store.save_device_name(name)?;
        self.metadata = updated;
        let now = self.last_service_ms;
        self.logs
            .record(now, format_args!("Device name set to {}", name));
        Ok(())
    }

    /// Operator log line `index`, 0 being the oldest retained
    pub fn log_entry(&self, index: usize) -> Option<&LogEntry> {
        self.logs.get(index)
    }

    /// Retained operator log, oldest first
    pub fn log_entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.logs.iter()
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    /// Run one complete setup sequence.
    ///
    /// Blocks the caller until the sequence ends. The new configuration
    /// replaces the active one only when it was saved; an aborted run keeps
    /// whatever was in use before.
    pub async fn run_setup<B, P, C>(&mut self, bus: &mut B, panel: &mut P, clock: &mut C) -> SetupOutcome
    where
        B: TemperatureBus,
        P: Button + Feedback,
        C: Clock,
    {
        self.setup_requested = false;
        self.logs
            .record(clock.now_ms(), format_args!("Entering setup mode"));

        let outcome = run_setup(&mut self.setup, bus, panel, clock, &mut self.store).await;
        let now = clock.now_ms();
        match outcome {
            SetupOutcome::Saved(configuration) => {
                self.configuration = configuration;
                self.load_status = LoadStatus::Configured;
                self.configured = true;
                self.logs.record(
                    now,
                    format_args!(
                        "Setup complete: {} sensors configured",
                        configuration.active_count()
                    ),
                );
            }
            SetupOutcome::Aborted(reason) => {
                self.logs
                    .record(now, format_args!("Setup aborted: {:?}", reason));
            }
        }

        self.setup_hold.reset();
        self.last_service_ms = now;
        outcome
    }

    /// One iteration of the main loop
    pub async fn service<B, R, P, C, W>(
        &mut self,
        bus: &mut B,
        radio: &mut R,
        panel: &mut P,
        clock: &mut C,
        power: &mut W,
    ) -> ServiceOutcome
    where
        B: TemperatureBus,
        R: Radio,
        P: Button + Feedback,
        C: Clock,
        W: PowerControl,
    {
        let now = clock.now_ms();
        let elapsed = now.saturating_sub(self.last_service_ms).min(u32::MAX as u64) as u32;
        self.last_service_ms = now;

        if self.setup_hold.update(elapsed, panel.is_pressed()) {
            self.setup_requested = true;
        }
        if self.setup_requested {
            let outcome = self.run_setup(bus, panel, clock).await;
            return ServiceOutcome::Setup(outcome);
        }

        if self.configured && self.scheduler.is_due(now) {
            return self.transmit(now, bus, radio, panel, power).await;
        }

        if self.configured
            && !self.metadata.power_save()
            && now.saturating_sub(self.last_heartbeat_ms) >= self.options.heartbeat_interval_ms as u64
        {
            self.last_heartbeat_ms = now;
            panel.signal(Pattern::Heartbeat);
        }

        ServiceOutcome::Idle
    }

    async fn transmit<B, R, P, W>(
        &mut self,
        now: u64,
        bus: &mut B,
        radio: &mut R,
        panel: &mut P,
        power: &mut W,
    ) -> ServiceOutcome
    where
        B: TemperatureBus,
        R: Radio,
        P: Feedback,
        W: PowerControl,
    {
        panel.signal(Pattern::Transmitting);
        let result = self
            .scheduler
            .run_cycle(
                now,
                &self.configuration,
                self.metadata.transmitter_id(),
                self.metadata.power_save(),
                bus,
                radio,
            )
            .await;

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                self.logs
                    .record(now, format_args!("Transmission failed: {:?}", e));
                return ServiceOutcome::TransmitFailed(e);
            }
        };

        self.log_reading(now, &report.reading);
        self.logs
            .record(now, format_args!("Transmitted: {}", report.packet));

        if let CycleOutcome::Suspend { duration_ms } = report.outcome {
            self.logs
                .record(now, format_args!("Entering deep sleep for {} ms", duration_ms));
            power.suspend(duration_ms).await;
        }
        ServiceOutcome::Transmitted(report.outcome)
    }

    fn log_reading(&mut self, now: u64, reading: &Reading) {
        use core::fmt::Write;

        let mut line: heapless::String<{ crate::config::logbuf::MAX_MESSAGE_LEN }> =
            heapless::String::new();
        let _ = write!(
            line,
            "Data: TX{} Ambient={:.2}",
            self.metadata.transmitter_id(),
            reading.ambient()
        );
        for (slot, temp) in reading
            .temps
            .iter()
            .enumerate()
            .take(self.configuration.active_count() as usize)
            .skip(1)
        {
            let _ = write!(line, " Pos{}={:.2}", slot, temp);
        }
        self.logs.record(now, format_args!("{}", line));
    }
}

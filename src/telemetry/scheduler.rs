//! Transmit scheduler
//!
//! Runs one read-encode-send cycle whenever the transmit interval has
//! passed since the previous cycle. In power save mode a successful send
//! asks the caller to suspend the whole device; nothing scheduled here
//! survives that.

use crate::config::slots::{DISCONNECTED_TEMP_C, MAX_SLOTS};
use crate::config::timing;
use crate::radio::Radio;
use crate::sensors::TemperatureBus;
use crate::storage::Configuration;
use crate::telemetry::encoder::{Packet, TelemetryEncoder, TelemetryError};
use crate::telemetry::types::{Reading, TransmissionStats};

/// Tunable scheduler parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval_ms: u32,
    /// Suspension after a send in power save mode
    pub sleep_duration_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: timing::TRANSMIT_INTERVAL_MS,
            sleep_duration_ms: timing::SLEEP_DURATION_MS,
        }
    }
}

/// What the caller must do after a successful cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Keep running
    Sent,
    /// Suspend the device for `duration_ms`
    Suspend { duration_ms: u32 },
}

/// Result of a successful cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub packet: Packet,
    pub reading: Reading,
    pub outcome: CycleOutcome,
}

pub struct TransmitScheduler {
    config: SchedulerConfig,
    last_cycle_ms: u64,
    reading: Reading,
    stats: TransmissionStats,
}

impl TransmitScheduler {
    /// The first cycle is due one interval after boot
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            last_cycle_ms: 0,
            reading: Reading::empty(),
            stats: TransmissionStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_cycle_ms) >= self.config.interval_ms as u64
    }

    /// Milliseconds until the next cycle, zero if overdue
    pub fn until_due(&self, now_ms: u64) -> u64 {
        (self.last_cycle_ms + self.config.interval_ms as u64).saturating_sub(now_ms)
    }

    /// Latest reading snapshot
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn stats(&self) -> &TransmissionStats {
        &self.stats
    }

    /// Read every assigned slot, encode and send.
    ///
    /// The next cycle is scheduled one interval from `now_ms` whether or not
    /// the send succeeds. A failed send is not counted and never suspends.
    pub async fn run_cycle<B: TemperatureBus, R: Radio>(
        &mut self,
        now_ms: u64,
        configuration: &Configuration,
        transmitter_id: u16,
        power_save: bool,
        bus: &mut B,
        radio: &mut R,
    ) -> Result<CycleReport, TelemetryError> {
        self.last_cycle_ms = now_ms;

        let converted = match bus.request_temperatures().await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Bus conversion failed: {:?}", e);
                false
            }
        };

        let active = (configuration.active_count() as usize).min(MAX_SLOTS);
        for slot in 0..active {
            let value = match configuration.slot(slot) {
                Some(address) if converted => match bus.read_temperature(&address).await {
                    Ok(value) if value.is_finite() => value,
                    Ok(value) => {
                        log::warn!("Slot {} ({}) read {}, treating as disconnected", slot, address, value);
                        DISCONNECTED_TEMP_C
                    }
                    Err(e) => {
                        log::warn!("Reading slot {} ({}) failed: {:?}", slot, address, e);
                        DISCONNECTED_TEMP_C
                    }
                },
                _ => DISCONNECTED_TEMP_C,
            };
            self.reading.temps[slot] = value;
        }
        self.reading.timestamp_s = (now_ms / 1000) as u32;
        self.reading.valid = true;

        let packet = TelemetryEncoder::encode(
            configuration.active_count(),
            &self.reading,
            transmitter_id,
        )?;
        log::debug!("Encoded packet: {}", packet);

        if let Err(e) = radio.transmit(packet.as_bytes()).await {
            log::error!("Transmission failed: {:?}", e);
            return Err(TelemetryError::Radio(e));
        }

        self.stats.total_packets = self.stats.total_packets.wrapping_add(1);
        self.stats.last_packet_ms = now_ms;
        self.stats.link = radio.link_stats();

        let outcome = if power_save {
            CycleOutcome::Suspend {
                duration_ms: self.config.sleep_duration_ms,
            }
        } else {
            CycleOutcome::Sent
        };

        Ok(CycleReport {
            packet,
            reading: self.reading,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::traits::mock::MockRadio;
    use crate::radio::{LinkStats, RadioError};
    use crate::sensors::traits::mock::MockBus;
    use crate::sensors::DeviceAddress;
    use futures::executor::block_on;

    fn addr(n: u8) -> DeviceAddress {
        DeviceAddress::new([0x28, 0x01, 0x02, n, 0, 0, 0, n])
    }

    fn setup(temps: &[f32]) -> (Configuration, MockBus) {
        let devices: std::vec::Vec<_> = (0..temps.len() as u8).map(addr).collect();
        let mut bus = MockBus::new(&devices, 0.0);
        for (i, t) in temps.iter().enumerate() {
            bus.set_temperature(i, *t);
        }
        (Configuration::from_addresses(&devices).unwrap(), bus)
    }

    #[test]
    fn test_first_cycle_due_after_interval() {
        let scheduler = TransmitScheduler::new(SchedulerConfig::default());
        assert!(!scheduler.is_due(0));
        assert!(!scheduler.is_due(29_999));
        assert!(scheduler.is_due(30_000));
        assert_eq!(scheduler.until_due(10_000), 20_000);
    }

    #[test]
    fn test_cycle_sends_packet_and_counts() {
        let (config, mut bus) = setup(&[25.1, 12.3, 18.0]);
        let mut radio = MockRadio::new();
        radio.set_link_stats(LinkStats { rssi: -87, snr: 9 });
        let mut scheduler = TransmitScheduler::new(SchedulerConfig::default());

        let report = block_on(scheduler.run_cycle(30_000, &config, 7, false, &mut bus, &mut radio))
            .unwrap();

        assert_eq!(report.outcome, CycleOutcome::Sent);
        assert_eq!(
            radio.last_packet().unwrap(),
            "TX7:12.3,18.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,25.1"
        );
        assert_eq!(scheduler.stats().total_packets, 1);
        assert_eq!(scheduler.stats().last_packet_ms, 30_000);
        assert_eq!(scheduler.stats().link.rssi, -87);
        assert!(scheduler.reading().valid);
        assert_eq!(scheduler.reading().timestamp_s, 30);
        assert!(!scheduler.is_due(59_999));
        assert!(scheduler.is_due(60_000));
    }

    #[test]
    fn test_power_save_requests_suspend() {
        let (config, mut bus) = setup(&[20.0]);
        let mut radio = MockRadio::new();
        let mut scheduler = TransmitScheduler::new(SchedulerConfig::default());

        let report = block_on(scheduler.run_cycle(30_000, &config, 1, true, &mut bus, &mut radio))
            .unwrap();
        assert_eq!(
            report.outcome,
            CycleOutcome::Suspend {
                duration_ms: 30_000
            }
        );
    }

    #[test]
    fn test_failed_send_not_counted_and_no_suspend() {
        let (config, mut bus) = setup(&[20.0]);
        let mut radio = MockRadio::new();
        radio.set_next_tx_error(RadioError::TransmitFailed);
        let mut scheduler = TransmitScheduler::new(SchedulerConfig::default());

        let result = block_on(scheduler.run_cycle(30_000, &config, 1, true, &mut bus, &mut radio));
        assert_eq!(
            result,
            Err(TelemetryError::Radio(RadioError::TransmitFailed))
        );
        assert_eq!(scheduler.stats().total_packets, 0);
        // Still rescheduled so a dead radio is not hammered
        assert!(!scheduler.is_due(30_001));
        // The reading itself was captured
        assert!(scheduler.reading().valid);
    }

    #[test]
    fn test_failed_probe_reports_disconnected() {
        let (config, mut bus) = setup(&[20.0, 30.0]);
        bus.fail_device(1);
        let mut radio = MockRadio::new();
        let mut scheduler = TransmitScheduler::new(SchedulerConfig::default());

        block_on(scheduler.run_cycle(30_000, &config, 2, false, &mut bus, &mut radio)).unwrap();
        assert_eq!(scheduler.reading().temps[1], DISCONNECTED_TEMP_C);
        assert!(radio.last_packet().unwrap().starts_with("TX2:-127.0,"));
    }

    #[test]
    fn test_non_finite_read_reports_disconnected() {
        let (config, mut bus) = setup(&[20.0, f32::NAN, f32::INFINITY]);
        let mut radio = MockRadio::new();
        let mut scheduler = TransmitScheduler::new(SchedulerConfig::default());

        block_on(scheduler.run_cycle(30_000, &config, 3, false, &mut bus, &mut radio)).unwrap();
        assert_eq!(scheduler.reading().temps[1], DISCONNECTED_TEMP_C);
        assert_eq!(scheduler.reading().temps[2], DISCONNECTED_TEMP_C);
        assert_eq!(
            radio.last_packet().unwrap(),
            "TX3:-127.0,-127.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,20.0"
        );
    }

    #[test]
    fn test_unconfigured_ambient_reports_disconnected() {
        let (_, mut bus) = setup(&[20.0]);
        let mut radio = MockRadio::new();
        let mut scheduler = TransmitScheduler::new(SchedulerConfig::default());

        block_on(scheduler.run_cycle(
            30_000,
            &Configuration::unconfigured(),
            1,
            false,
            &mut bus,
            &mut radio,
        ))
        .unwrap();
        assert!(radio.last_packet().unwrap().ends_with(",-127.0"));
    }

    #[test]
    fn test_custom_interval() {
        let scheduler = TransmitScheduler::new(SchedulerConfig {
            interval_ms: 1_000,
            sleep_duration_ms: 5_000,
        });
        assert!(scheduler.is_due(1_000));
    }
}

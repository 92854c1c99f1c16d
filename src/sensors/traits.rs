//! Temperature bus trait for abstraction and testability
//!
//! The physical one-wire driver lives in the board crate. Everything in this
//! crate talks to the bus through [`TemperatureBus`] so setup and telemetry
//! can run against a scripted mock.

use crate::config::slots::MAX_BUS_DEVICES;
use crate::sensors::DeviceAddress;
use core::future::Future;
use heapless::Vec;

/// Errors that can occur during bus operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No device answered the reset pulse
    NoPresence,
    /// Scratchpad CRC did not match
    CrcMismatch,
    /// Conversion did not finish in time
    Timeout,
    /// The addressed device is not on the bus
    Disconnected,
}

/// Abstract temperature bus
pub trait TemperatureBus {
    /// Enumerate the addresses of all devices on the bus, in search order
    fn enumerate(
        &mut self,
    ) -> impl Future<Output = Result<Vec<DeviceAddress, MAX_BUS_DEVICES>, BusError>>;

    /// Start a conversion on every device and wait until it is done
    fn request_temperatures(&mut self) -> impl Future<Output = Result<(), BusError>>;

    /// Read the last converted temperature (degrees C) of one device
    fn read_temperature(
        &mut self,
        address: &DeviceAddress,
    ) -> impl Future<Output = Result<f32, BusError>>;
}

/// Convert all devices and read each candidate, in order.
///
/// Failed and non-finite reads are reported as `None` so one bad probe does
/// not hide the others. A failed conversion request yields an all-`None` sample.
pub async fn sample_all<B: TemperatureBus>(
    bus: &mut B,
    candidates: &[DeviceAddress],
) -> Vec<Option<f32>, MAX_BUS_DEVICES> {
    let mut sample = Vec::new();
    let converted = match bus.request_temperatures().await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Bus conversion failed: {:?}", e);
            false
        }
    };

    for address in candidates {
        let value = if converted {
            bus.read_temperature(address)
                .await
                .ok()
                .filter(|value| value.is_finite())
        } else {
            None
        };
        if sample.push(value).is_err() {
            break;
        }
    }
    sample
}

//! Radio trait for abstraction and testability
//!
//! The board crate owns the LoRa transceiver and its modulation settings.
//! Telemetry only needs to hand over a finished packet and read back the
//! link quality.

use core::future::Future;

/// Errors that can occur during radio operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Transmission failed
    TransmitFailed,
    /// Operation timed out
    Timeout,
    /// Packet longer than the radio accepts
    PayloadTooLarge,
    /// Radio not initialised
    NotInitialised,
}

/// Link quality reported by the radio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Received Signal Strength Indicator in dBm
    pub rssi: i16,
    /// Signal-to-Noise Ratio in dB
    pub snr: i8,
}

/// Abstract radio interface
pub trait Radio {
    /// Transmit one packet, returning once it is on air
    fn transmit(&mut self, data: &[u8]) -> impl Future<Output = Result<(), RadioError>>;

    /// Latest link quality figures
    fn link_stats(&self) -> LinkStats;
}

#[cfg(test)]
pub mod mock {
    //! Mock radio for testing

    use super::*;
    use crate::config::telemetry::MAX_PACKET_LEN;
    use core::cell::RefCell;
    use heapless::Vec;

    /// Mock radio recording transmitted packets
    pub struct MockRadio {
        tx_history: RefCell<Vec<Vec<u8, MAX_PACKET_LEN>, 16>>,
        next_tx_error: RefCell<Option<RadioError>>,
        stats: LinkStats,
    }

    impl MockRadio {
        pub fn new() -> Self {
            Self {
                tx_history: RefCell::new(Vec::new()),
                next_tx_error: RefCell::new(None),
                stats: LinkStats::default(),
            }
        }

        /// Set an error to be returned by the next transmit() call
        pub fn set_next_tx_error(&self, error: RadioError) {
            *self.next_tx_error.borrow_mut() = Some(error);
        }

        pub fn set_link_stats(&mut self, stats: LinkStats) {
            self.stats = stats;
        }

        /// Get all transmitted packets
        pub fn get_tx_history(&self) -> Vec<Vec<u8, MAX_PACKET_LEN>, 16> {
            self.tx_history.borrow().clone()
        }

        /// Last transmitted packet as text
        pub fn last_packet(&self) -> Option<std::string::String> {
            self.tx_history
                .borrow()
                .last()
                .map(|p| std::string::String::from_utf8_lossy(p).into_owned())
        }
    }

    impl Default for MockRadio {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Radio for MockRadio {
        async fn transmit(&mut self, data: &[u8]) -> Result<(), RadioError> {
            if let Some(err) = self.next_tx_error.borrow_mut().take() {
                return Err(err);
            }
            let packet = Vec::from_slice(data).map_err(|_| RadioError::PayloadTooLarge)?;
            let _ = self.tx_history.borrow_mut().push(packet);
            Ok(())
        }

        fn link_stats(&self) -> LinkStats {
            self.stats
        }
    }
}

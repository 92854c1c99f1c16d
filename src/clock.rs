//! Monotonic clock and delays
//!
//! Setup and the telemetry loop take time from a [`Clock`] so both can be
//! run against virtual time in tests.

use core::future::Future;

/// Milliseconds since boot plus an async delay
pub trait Clock {
    /// Milliseconds since boot
    fn now_ms(&self) -> u64;

    /// Wait for `ms` milliseconds
    fn sleep_ms(&mut self, ms: u32) -> impl Future<Output = ()>;
}

/// Clock backed by the embassy time driver
#[cfg(feature = "embedded")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embedded")]
impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }

    async fn sleep_ms(&mut self, ms: u32) {
        embassy_time::Timer::after_millis(ms as u64).await;
    }
}

#[cfg(test)]
pub mod mock {
    //! Virtual clock for testing

    use super::*;
    use core::cell::Cell;

    /// Clock whose time only moves when slept on or advanced
    #[derive(Default)]
    pub struct MockClock {
        now: Cell<u64>,
        sleeps: Cell<u32>,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn starting_at(ms: u64) -> Self {
            let clock = Self::default();
            clock.now.set(ms);
            clock
        }

        pub fn advance(&self, ms: u64) {
            self.now.set(self.now.get() + ms);
        }

        /// Number of `sleep_ms` calls so far
        pub fn sleeps(&self) -> u32 {
            self.sleeps.get()
        }
    }

    impl Clock for MockClock {
        fn now_ms(&self) -> u64 {
            self.now.get()
        }

        async fn sleep_ms(&mut self, ms: u32) {
            self.sleeps.set(self.sleeps.get() + 1);
            self.advance(ms as u64);
        }
    }
}

//! Whole-device suspension for the power save cycle

use core::future::Future;

/// Board power control
pub trait PowerControl {
    /// Suspend the device for `duration_ms` and resume on the wake timer.
    ///
    /// Boards using deep sleep never return from this: the device boots
    /// again when the timer fires and no in-process state survives.
    fn suspend(&mut self, duration_ms: u32) -> impl Future<Output = ()>;
}

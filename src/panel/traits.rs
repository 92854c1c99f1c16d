//! Button and feedback traits for abstraction and testability
//!
//! The board crate maps [`Pattern`]s onto its LEDs and buzzer. Nothing in
//! this crate waits on a pattern to finish playing.

/// Feedback patterns requested from the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Setup mode entered
    SetupEntered,
    /// Waiting for the ambient probe to be touched
    AmbientPrompt,
    /// Waiting for the probe of the given position
    PositionPrompt(u8),
    /// A probe was assigned to a slot
    Assigned,
    /// The touched probe already has a slot
    DuplicateRejected,
    /// No ambient probe identified, setup aborted
    AmbientFailed,
    /// Final uniqueness check failed, setup aborted
    ValidationFailed,
    /// Configuration saved
    SetupComplete,
    /// Writing the configuration failed, setup aborted
    SaveFailed,
    /// No probes found on the bus
    NoDevices,
    /// Idle alive blink
    Heartbeat,
    /// Telemetry packet on air
    Transmitting,
    /// Stored configuration failed its uniqueness check at boot
    ConfigCorrupt,
    /// Boot finished with a configuration
    Ready,
    /// Boot finished without a configuration
    Unconfigured,
}

/// Momentary push button, active while held
pub trait Button {
    fn is_pressed(&self) -> bool;
}

/// LED and buzzer output
pub trait Feedback {
    fn signal(&mut self, pattern: Pattern);
}

//! Setup state machine
//!
//! Identifies the ambient probe, then up to nine position probes, by touch.
//! The machine is driven by [`SetupStateMachine::poll`] with the time since
//! the previous tick, the button state and a fresh sample of every
//! candidate. It never sleeps, reads the bus or writes the store; those are
//! requested through [`SetupEffect`]s and carried out by the caller.
//!
//! ```text
//! Idle -> WaitingForAmbient -> WaitingForPosition(1..=9) -> Validating -> Saved
//!               |                                              |
//!               +------------------> Aborted <-----------------+
//! ```

use heapless::Vec;

use crate::config::slots::{AMBIENT_SLOT, MAX_BUS_DEVICES, MAX_SLOTS};
use crate::config::timing;
use crate::panel::{HoldDetector, Pattern};
use crate::sensors::{DeviceAddress, TouchIdentifier, TouchPoll};
use crate::storage::{Configuration, DuplicatePair, SaveError};

/// Why a setup run ended without saving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The bus scan found nothing
    NoDevicesEnumerated,
    /// No ambient probe was touched within its budget
    IdentificationTimedOut,
    /// The final uniqueness check failed
    DuplicateAddresses(DuplicatePair),
    /// The store refused the configuration
    StorageFailed(SaveError),
}

/// Setup progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    Idle,
    WaitingForAmbient,
    /// Waiting for the probe of the given position (1..=9)
    WaitingForPosition(u8),
    /// Configuration checked, waiting for the caller to persist it
    Validating,
    Saved,
    Aborted(AbortReason),
}

impl SetupState {
    /// True for `Saved` and `Aborted`
    pub fn is_terminal(&self) -> bool {
        matches!(self, SetupState::Saved | SetupState::Aborted(_))
    }
}

/// Tunable setup parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupTiming {
    /// Deviation from baseline (degrees C) that counts as a touch
    pub threshold_c: f32,
    pub ambient_budget_ms: u32,
    pub position_window_ms: u32,
    pub save_hold_ms: u32,
    /// Sampling cadence used by the runner
    pub poll_interval_ms: u32,
    /// Wait between the baseline conversion request and reading it
    pub baseline_settle_ms: u32,
}

impl Default for SetupTiming {
    fn default() -> Self {
        Self {
            threshold_c: timing::TOUCH_THRESHOLD_C,
            ambient_budget_ms: timing::AMBIENT_BUDGET_MS,
            position_window_ms: timing::POSITION_WINDOW_MS,
            save_hold_ms: timing::SAVE_HOLD_MS,
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            baseline_settle_ms: timing::BASELINE_SETTLE_MS,
        }
    }
}

/// Input of one poll
#[derive(Debug, Clone, Copy)]
pub struct SetupTick<'a> {
    /// Time since the previous tick
    pub elapsed_ms: u32,
    /// Whether the save button is down
    pub hold_pressed: bool,
    /// Latest reading of each candidate, in enumeration order
    pub sample: &'a [Option<f32>],
}

/// Side effects requested by the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupEffect {
    /// Play a feedback pattern
    Signal(Pattern),
    /// `address` now occupies `slot`
    Assigned { slot: u8, address: DeviceAddress },
    /// `address` was touched for `slot` but already has an earlier slot
    DuplicateRejected { slot: u8, address: DeviceAddress },
    /// Save [`SetupStateMachine::configuration`] and report back through
    /// [`SetupStateMachine::persist_result`]
    Persist,
}

/// Maximum effects produced by a single transition
pub const MAX_EFFECTS: usize = 2 * MAX_BUS_DEVICES + 4;

/// Outcome of one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupStep {
    pub state: SetupState,
    pub effects: Vec<SetupEffect, MAX_EFFECTS>,
}

impl SetupStep {
    fn quiet(state: SetupState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

/// Touch-to-identify setup sequence
pub struct SetupStateMachine {
    timing: SetupTiming,
    state: SetupState,
    candidates: Vec<DeviceAddress, MAX_BUS_DEVICES>,
    touch: TouchIdentifier,
    save_hold: HoldDetector,
    configuration: Configuration,
}

impl SetupStateMachine {
    pub fn new(timing: SetupTiming) -> Self {
        Self {
            timing,
            state: SetupState::Idle,
            candidates: Vec::new(),
            touch: TouchIdentifier::new(&[], timing.threshold_c),
            save_hold: HoldDetector::new(timing.save_hold_ms),
            configuration: Configuration::cleared(),
        }
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn timing(&self) -> &SetupTiming {
        &self.timing
    }

    /// Configuration built so far
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Candidates of the current run, in enumeration order
    pub fn candidates(&self) -> &[DeviceAddress] {
        &self.candidates
    }

    /// Start a run with the enumerated candidates and their baselines.
    ///
    /// Restarts from scratch whatever the current state. Anything past
    /// [`MAX_BUS_DEVICES`] candidates is ignored.
    pub fn begin(&mut self, candidates: &[DeviceAddress], baselines: &[Option<f32>]) -> SetupStep {
        let mut effects = Vec::new();
        self.configuration = Configuration::cleared();
        self.candidates.clear();
        for address in candidates.iter().take(MAX_BUS_DEVICES) {
            let _ = self.candidates.push(*address);
        }

        let _ = effects.push(SetupEffect::Signal(Pattern::SetupEntered));

        if self.candidates.is_empty() {
            log::error!("Setup aborted: no sensors found");
            self.state = SetupState::Aborted(AbortReason::NoDevicesEnumerated);
            let _ = effects.push(SetupEffect::Signal(Pattern::NoDevices));
            return SetupStep {
                state: self.state,
                effects,
            };
        }

        log::info!(
            "Setup started with {} candidate(s), touch the AMBIENT sensor",
            self.candidates.len()
        );
        self.touch = TouchIdentifier::new(baselines, self.timing.threshold_c);
        self.touch.arm(self.timing.ambient_budget_ms);
        self.state = SetupState::WaitingForAmbient;
        let _ = effects.push(SetupEffect::Signal(Pattern::AmbientPrompt));

        SetupStep {
            state: self.state,
            effects,
        }
    }

    /// Advance the machine by one tick
    pub fn poll(&mut self, tick: SetupTick<'_>) -> SetupStep {
        let mut effects = Vec::new();
        match self.state {
            SetupState::WaitingForAmbient => self.poll_ambient(tick, &mut effects),
            SetupState::WaitingForPosition(position) => {
                self.poll_position(position, tick, &mut effects)
            }
            // Idle, terminal, or waiting for the persist result
            _ => return SetupStep::quiet(self.state),
        }
        SetupStep {
            state: self.state,
            effects,
        }
    }

    /// Report the outcome of a requested [`SetupEffect::Persist`]
    pub fn persist_result(&mut self, result: Result<(), SaveError>) -> SetupStep {
        if self.state != SetupState::Validating {
            return SetupStep::quiet(self.state);
        }

        let mut effects = Vec::new();
        match result {
            Ok(()) => {
                log::info!(
                    "Setup complete: {} sensors configured",
                    self.configuration.active_count()
                );
                self.state = SetupState::Saved;
                let _ = effects.push(SetupEffect::Signal(Pattern::SetupComplete));
            }
            Err(e) => {
                log::error!("Saving configuration failed: {:?}", e);
                self.state = SetupState::Aborted(AbortReason::StorageFailed(e));
                let _ = effects.push(SetupEffect::Signal(Pattern::SaveFailed));
            }
        }
        SetupStep {
            state: self.state,
            effects,
        }
    }

    fn poll_ambient(&mut self, tick: SetupTick<'_>, effects: &mut Vec<SetupEffect, MAX_EFFECTS>) {
        match self.touch.poll(tick.elapsed_ms, tick.sample) {
            TouchPoll::Pending => {}
            TouchPoll::TimedOut => {
                log::error!("AMBIENT sensor is required, setup aborted");
                self.state = SetupState::Aborted(AbortReason::IdentificationTimedOut);
                let _ = effects.push(SetupEffect::Signal(Pattern::AmbientFailed));
            }
            TouchPoll::Touched {
                index,
                baseline,
                reading,
            } => {
                log::info!(
                    "Temperature change on sensor {}: {:.2} -> {:.2}",
                    index,
                    baseline,
                    reading
                );
                if self.assign(AMBIENT_SLOT as u8, index, effects) {
                    self.enter_position(1, effects);
                } else {
                    self.validate(effects);
                }
            }
        }
    }

    fn poll_position(
        &mut self,
        position: u8,
        tick: SetupTick<'_>,
        effects: &mut Vec<SetupEffect, MAX_EFFECTS>,
    ) {
        if self.save_hold.update(tick.elapsed_ms, tick.hold_pressed) {
            log::info!("Save button held, finalizing setup");
            self.validate(effects);
            return;
        }

        if self.touch.advance(tick.elapsed_ms) {
            log::info!(
                "No sensor detected for position {}, {} sensors assigned",
                position,
                self.configuration.active_count()
            );
            self.validate(effects);
            return;
        }

        // Touches are not evaluated while a save hold is in progress
        if tick.hold_pressed {
            return;
        }

        let mut start = 0;
        while let TouchPoll::Touched { index, .. } = self.touch.scan(tick.sample, start) {
            let Some(address) = self.candidates.get(index).copied() else {
                break;
            };

            if self.configuration.is_duplicate(&address, position) {
                log::warn!(
                    "Sensor {} is already assigned, touch a different sensor",
                    address
                );
                let _ = effects.push(SetupEffect::DuplicateRejected {
                    slot: position,
                    address,
                });
                let _ = effects.push(SetupEffect::Signal(Pattern::DuplicateRejected));
                self.touch.arm(self.timing.position_window_ms);
                start = index + 1;
                continue;
            }

            if self.assign(position, index, effects) {
                self.enter_position(position + 1, effects);
            } else {
                self.validate(effects);
            }
            return;
        }
    }

    /// Put candidate `index` into `slot`; false if the table refused it
    fn assign(&mut self, slot: u8, index: usize, effects: &mut Vec<SetupEffect, MAX_EFFECTS>) -> bool {
        let Some(address) = self.candidates.get(index).copied() else {
            return false;
        };
        match self.configuration.assign(slot, address) {
            Ok(()) => {
                log::info!("Slot {} identified: {}", slot, address);
                let _ = effects.push(SetupEffect::Assigned { slot, address });
                let _ = effects.push(SetupEffect::Signal(Pattern::Assigned));
                true
            }
            Err(e) => {
                log::error!("Assigning slot {} failed: {:?}", slot, e);
                false
            }
        }
    }

    fn enter_position(&mut self, position: u8, effects: &mut Vec<SetupEffect, MAX_EFFECTS>) {
        if position as usize >= MAX_SLOTS {
            log::info!("All positions assigned");
            self.validate(effects);
            return;
        }
        self.state = SetupState::WaitingForPosition(position);
        self.touch.arm(self.timing.position_window_ms);
        self.save_hold.reset();
        let _ = effects.push(SetupEffect::Signal(Pattern::PositionPrompt(position)));
    }

    fn validate(&mut self, effects: &mut Vec<SetupEffect, MAX_EFFECTS>) {
        if let Some(pair) = self.configuration.validate_unique() {
            log::error!("Duplicate sensors detected between {}", pair);
            self.state = SetupState::Aborted(AbortReason::DuplicateAddresses(pair));
            let _ = effects.push(SetupEffect::Signal(Pattern::ValidationFailed));
            return;
        }
        if self.configuration.ambient().is_none() {
            // Only reachable if the ambient assignment itself failed
            self.state = SetupState::Aborted(AbortReason::IdentificationTimedOut);
            let _ = effects.push(SetupEffect::Signal(Pattern::AmbientFailed));
            return;
        }
        self.state = SetupState::Validating;
        let _ = effects.push(SetupEffect::Persist);
    }
}

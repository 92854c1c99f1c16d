//! Drives a [`SetupStateMachine`] against the real collaborators
//!
//! Enumerates the bus, captures baselines, then samples every candidate on
//! the poll cadence and feeds the machine until it reaches a terminal
//! state. All other device work is stalled while this runs.

use heapless::Vec;

use crate::clock::Clock;
use crate::config::slots::MAX_BUS_DEVICES;
use crate::panel::{Button, Feedback};
use crate::sensors::traits::sample_all;
use crate::sensors::{DeviceAddress, TemperatureBus};
use crate::setup::machine::{
    AbortReason, SetupEffect, SetupState, SetupStateMachine, SetupStep, SetupTick,
};
use crate::storage::{ConfigStore, Configuration, Storage};

/// How a setup run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The configuration was validated and persisted
    Saved(Configuration),
    Aborted(AbortReason),
}

/// Run one complete setup sequence
pub async fn run_setup<B, P, C, S>(
    machine: &mut SetupStateMachine,
    bus: &mut B,
    panel: &mut P,
    clock: &mut C,
    store: &mut ConfigStore<S>,
) -> SetupOutcome
where
    B: TemperatureBus,
    P: Button + Feedback,
    C: Clock,
    S: Storage,
{
    let candidates = match bus.enumerate().await {
        Ok(found) => found,
        Err(e) => {
            log::error!("Bus scan failed: {:?}", e);
            Vec::new()
        }
    };
    log::info!("Scanning for sensors... found {} device(s)", candidates.len());
    for (i, address) in candidates.iter().enumerate() {
        log::info!("  device {}: {}", i, address);
    }

    let baselines = capture_baselines(bus, clock, &candidates, machine.timing().baseline_settle_ms).await;

    let step = machine.begin(&candidates, &baselines);
    apply(machine, step, panel, store);

    let poll_interval = machine.timing().poll_interval_ms;
    let mut last_ms = clock.now_ms();
    while !machine.state().is_terminal() {
        clock.sleep_ms(poll_interval).await;
        let sample = sample_all(bus, &candidates).await;
        let now_ms = clock.now_ms();
        let elapsed_ms = now_ms.saturating_sub(last_ms).min(u32::MAX as u64) as u32;
        last_ms = now_ms;

        let step = machine.poll(SetupTick {
            elapsed_ms,
            hold_pressed: panel.is_pressed(),
            sample: &sample,
        });
        apply(machine, step, panel, store);
    }

    match machine.state() {
        SetupState::Aborted(reason) => SetupOutcome::Aborted(reason),
        _ => SetupOutcome::Saved(*machine.configuration()),
    }
}

async fn capture_baselines<B: TemperatureBus, C: Clock>(
    bus: &mut B,
    clock: &mut C,
    candidates: &[DeviceAddress],
    settle_ms: u32,
) -> Vec<Option<f32>, MAX_BUS_DEVICES> {
    let mut baselines = Vec::new();
    if candidates.is_empty() {
        return baselines;
    }

    let converted = match bus.request_temperatures().await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Baseline conversion failed: {:?}", e);
            false
        }
    };
    clock.sleep_ms(settle_ms).await;

    for (i, address) in candidates.iter().enumerate() {
        let baseline = if converted {
            bus.read_temperature(address).await.ok()
        } else {
            None
        };
        match baseline {
            Some(t) => log::info!("  device {} baseline: {:.2}", i, t),
            None => log::warn!("  device {} baseline unavailable", i),
        }
        let _ = baselines.push(baseline);
    }
    baselines
}

/// Carry out the effects of `step`, including any persist round trip
fn apply<P, S>(
    machine: &mut SetupStateMachine,
    step: SetupStep,
    panel: &mut P,
    store: &mut ConfigStore<S>,
) where
    P: Feedback,
    S: Storage,
{
    let mut pending = Some(step);
    while let Some(step) = pending.take() {
        for effect in step.effects {
            match effect {
                SetupEffect::Signal(pattern) => panel.signal(pattern),
                SetupEffect::Persist => {
                    let result = store.save(machine.configuration());
                    pending = Some(machine.persist_result(result));
                }
                SetupEffect::Assigned { .. } | SetupEffect::DuplicateRejected { .. } => {}
            }
        }
    }
}

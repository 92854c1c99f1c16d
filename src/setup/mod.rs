//! Touch-to-identify probe setup

pub mod machine;
pub mod runner;

pub use machine::{
    AbortReason, SetupEffect, SetupState, SetupStateMachine, SetupStep, SetupTick, SetupTiming,
};
pub use runner::{run_setup, SetupOutcome};

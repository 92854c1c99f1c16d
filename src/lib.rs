#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod commands;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod logbuf;
pub mod panel;
pub mod power;
pub mod radio;
pub mod sensors;
pub mod serial;
pub mod setup;
pub mod storage;
pub mod telemetry;

// Tasks depend on embassy and are only available with the embedded feature
#[cfg(feature = "embedded")]
pub mod tasks;

//! Embassy tasks module
//!
//! Board-independent async tasks. The board crate builds the peripherals,
//! wraps these in `#[embassy_executor::task]` functions and spawns them.

pub mod device;
pub mod serial;

pub use device::{device_task, CommandReceiver, Peripherals};
pub use serial::{serial_reader_task, serial_writer_task, CommandSender};

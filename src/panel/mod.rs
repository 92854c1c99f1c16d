//! Operator panel: the setup button and the LED/buzzer feedback

pub mod hold;
pub mod traits;

pub use hold::HoldDetector;
pub use traits::{Button, Feedback, Pattern};

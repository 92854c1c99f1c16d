//! Command dispatch and, on embedded builds, the channels between tasks

pub mod handler;

pub use handler::CommandDispatcher;

#[cfg(feature = "embedded")]
mod channels;

#[cfg(feature = "embedded")]
pub use channels::{
    CommandEnvelope, CommandSource, ResponseMessage, COMMAND_CHANNEL, COMMAND_CHANNEL_SIZE,
    RESPONSE_CHANNEL,
};

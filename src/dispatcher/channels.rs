//! Channels between the serial tasks and the device task

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::pubsub::PubSubChannel;

use crate::commands::types::{Command, Response};

/// Channel capacity for incoming commands
pub const COMMAND_CHANNEL_SIZE: usize = 8;

/// Identifies the interface a command arrived on, for routing the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Serial,
}

/// Envelope wrapping a command with metadata
#[derive(Debug, Clone)]
pub struct CommandEnvelope {
    pub command: Command,
    pub source: CommandSource,
    /// Sequence ID for matching responses to requests
    pub sequence_id: u16,
}

/// Outgoing response, filtered by subscribers on `source`
#[derive(Debug, Clone)]
pub struct ResponseMessage {
    pub source: CommandSource,
    pub sequence_id: u16,
    pub response: Response,
}

/// Commands from every interface; the device task is the single consumer.
///
/// Commands queue here while a setup run is in progress.
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, CommandEnvelope, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Responses from the device task and the serial reader's parse errors.
///
/// Parameters: CAP=8 messages, SUBS=1 (serial writer), PUBS=2 (device task,
/// serial reader)
pub static RESPONSE_CHANNEL: PubSubChannel<CriticalSectionRawMutex, ResponseMessage, 8, 1, 2> =
    PubSubChannel::new();

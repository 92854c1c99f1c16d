//! Serial tasks for command/response handling.
//!
//! These tasks are generic over any type implementing embedded_io_async
//! traits, so they work with USB Serial JTAG, a UART or a CDC-ACM port.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embedded_io_async::{Read, Write};

use crate::commands::{Response, ResponseSerialiser};
use crate::dispatcher::{
    CommandEnvelope, CommandSource, ResponseMessage, COMMAND_CHANNEL_SIZE, RESPONSE_CHANNEL,
};
use crate::serial::{CommandReader, ReadResult};

/// Type alias for the command channel sender
pub type CommandSender =
    Sender<'static, CriticalSectionRawMutex, CommandEnvelope, COMMAND_CHANNEL_SIZE>;

/// Task that reads commands from a serial interface.
///
/// Parse errors are answered directly without involving the device task.
pub async fn serial_reader_task<R: Read>(mut reader: R, command_sender: CommandSender) {
    let mut commands = CommandReader::new();
    let response_pub = RESPONSE_CHANNEL.immediate_publisher();

    loop {
        let mut buf = [0u8; 64];
        let n = match reader.read(&mut buf).await {
            Ok(0) => continue,
            Ok(n) => n,
            Err(_) => {
                // UART error, back off briefly
                embassy_time::Timer::after_millis(10).await;
                continue;
            }
        };

        for &byte in &buf[..n] {
            let Some(result) = commands.push(byte) else {
                continue;
            };
            let sequence_id = commands.next_sequence_id();
            match result {
                ReadResult::Command(command) => {
                    command_sender
                        .send(CommandEnvelope {
                            command,
                            source: CommandSource::Serial,
                            sequence_id,
                        })
                        .await;
                }
                ReadResult::ParseError(status, command_id) => {
                    log::warn!("Rejected frame for command {:#04x}: {:?}", command_id, status);
                    response_pub.publish_immediate(ResponseMessage {
                        source: CommandSource::Serial,
                        sequence_id,
                        response: Response::error_raw(status, command_id),
                    });
                }
            }
        }
    }
}

/// Task that writes responses to a serial interface.
pub async fn serial_writer_task<W: Write>(mut writer: W) {
    let serialiser = ResponseSerialiser::new();

    let mut response_sub = match RESPONSE_CHANNEL.subscriber() {
        Ok(sub) => sub,
        Err(e) => {
            log::error!("Serial writer could not subscribe to responses: {:?}", e);
            return;
        }
    };

    loop {
        let msg = response_sub.next_message_pure().await;
        if msg.source != CommandSource::Serial {
            continue;
        }

        let encoded = serialiser.serialise(&msg.response);
        if writer.write_all(&encoded).await.is_err() {
            log::warn!("Dropped response {}", msg.sequence_id);
        }
    }
}

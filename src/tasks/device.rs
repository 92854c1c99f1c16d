//! Device task: the main loop plus command handling
//!
//! Runs [`Device::service`] on the poll cadence and answers commands in
//! between. While a setup run is in progress commands wait in the channel.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::Timer;

use crate::clock::Clock;
use crate::config::timing::POLL_INTERVAL_MS;
use crate::device::{Device, ServiceOutcome};
use crate::dispatcher::{
    CommandDispatcher, CommandEnvelope, ResponseMessage, COMMAND_CHANNEL_SIZE, RESPONSE_CHANNEL,
};
use crate::panel::{Button, Feedback};
use crate::power::PowerControl;
use crate::radio::Radio;
use crate::sensors::TemperatureBus;
use crate::storage::Storage;

/// Type alias for the command channel receiver
pub type CommandReceiver =
    Receiver<'static, CriticalSectionRawMutex, CommandEnvelope, COMMAND_CHANNEL_SIZE>;

/// Hardware the device loop drives
pub struct Peripherals<B, R, P, C, W> {
    pub bus: B,
    pub radio: R,
    pub panel: P,
    pub clock: C,
    pub power: W,
}

/// Task that owns the device and runs the main loop forever
pub async fn device_task<S, B, R, P, C, W>(
    mut device: Device<S>,
    mut hw: Peripherals<B, R, P, C, W>,
    command_receiver: CommandReceiver,
) where
    S: Storage,
    B: TemperatureBus,
    R: Radio,
    P: Button + Feedback,
    C: Clock,
    W: PowerControl,
{
    let dispatcher = CommandDispatcher::new();
    let response_pub = RESPONSE_CHANNEL.immediate_publisher();

    loop {
        let outcome = device
            .service(
                &mut hw.bus,
                &mut hw.radio,
                &mut hw.panel,
                &mut hw.clock,
                &mut hw.power,
            )
            .await;
        if let ServiceOutcome::TransmitFailed(e) = outcome {
            log::warn!("Transmit cycle failed: {:?}", e);
        }

        let first = match select(
            Timer::after_millis(POLL_INTERVAL_MS as u64),
            command_receiver.receive(),
        )
        .await
        {
            Either::First(()) => continue,
            Either::Second(envelope) => envelope,
        };

        let mut next = Some(first);
        while let Some(envelope) = next.take() {
            let response = dispatcher.dispatch(&mut device, envelope.command);
            response_pub.publish_immediate(ResponseMessage {
                source: envelope.source,
                sequence_id: envelope.sequence_id,
                response,
            });
            next = command_receiver.try_receive().ok();
        }
    }
}

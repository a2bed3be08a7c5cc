/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Turns a fired [`TimingEvent`] into hardware calls.
//!
//! # Output paths
//!
//! | Vector shape | Driver calls |
//! |---|---|
//! | exactly one non-`Retain` channel | one `apply(channel, level)` |
//! | no `Retain` channel | one `apply_all(mask)` |
//! | mixed | one `apply` per non-`Retain` channel, in order `0..8` |
//! | all `Retain` | none (warning logged) |
//!
//! Serial frames go to `send_rs485` verbatim or to `send_can` with the
//! payload cut to [`SerialTransport::max_can_payload`].
//!
//! Hardware failures are logged and swallowed.  A failed firing is not
//! retried; the next scheduled firing is the retry point.

use tracing::{debug, error, info, warn};

use crate::event::{
    ActionPayload, ChannelState, SerialFrame, SerialPort, TimingEvent, DOUT_CHANNELS,
};
use crate::hal::{IoError, OutputDriver, SerialTransport};

// ── Outcome ───────────────────────────────────────────────────────────────────

/// What one call to [`Executor::execute`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Outputs were written with `calls` driver calls.
    Outputs { calls: usize },
    /// A frame of `bytes` bytes was handed to a transceiver.
    Transmitted { bytes: usize },
    /// Every channel was `Retain`; nothing was driven.
    NoControl,
    /// A driver or transceiver call failed.  Already logged.
    Failed,
}

// ── Executor ──────────────────────────────────────────────────────────────────

/// Owns the output bank and the serial transceivers.
#[derive(Debug)]
pub struct Executor<O, S> {
    outputs: O,
    serial: S,
}

impl<O: OutputDriver, S: SerialTransport> Executor<O, S> {
    pub fn new(outputs: O, serial: S) -> Self {
        Self { outputs, serial }
    }

    /// Perform the event's action.  Never fails; see [`Outcome`].
    pub fn execute(&mut self, event: &TimingEvent) -> Outcome {
        let result = match &event.action {
            ActionPayload::DoutVector { channels } => self.drive_outputs(channels),
            ActionPayload::Serial(frame) => self.transmit(frame),
        };
        match result {
            Ok(Outcome::NoControl) => {
                warn!(
                    sequence_number = event.sequence_number,
                    "Event {} : no dout control", event.sequence_number
                );
                Outcome::NoControl
            }
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    sequence_number = event.sequence_number,
                    error = %e,
                    "Event action failed"
                );
                Outcome::Failed
            }
        }
    }

    fn drive_outputs(
        &mut self,
        channels: &[ChannelState; DOUT_CHANNELS],
    ) -> Result<Outcome, IoError> {
        let explicit: Vec<(u8, bool)> = channels
            .iter()
            .enumerate()
            .filter_map(|(i, ch)| ch.level().map(|level| (i as u8, level)))
            .collect();

        match explicit.as_slice() {
            [] => Ok(Outcome::NoControl),
            [(channel, level)] => {
                self.outputs.apply(*channel, *level)?;
                Ok(Outcome::Outputs { calls: 1 })
            }
            all if all.len() == DOUT_CHANNELS => {
                let mask = all
                    .iter()
                    .fold(0u8, |m, &(i, level)| if level { m | (1u8 << i) } else { m });
                debug!(mask = format_args!("{:#010b}", mask), "Writing whole Dout bank");
                self.outputs.apply_all(mask)?;
                Ok(Outcome::Outputs { calls: 1 })
            }
            mixed => {
                // A failing channel does not stop the remaining ones; the
                // first error is reported once all have been tried.
                let mut first_err = None;
                for (channel, level) in mixed {
                    if let Err(e) = self.outputs.apply(*channel, *level) {
                        warn!(channel, error = %e, "Dout channel write failed");
                        first_err.get_or_insert(e);
                    }
                }
                match first_err {
                    Some(e) => Err(e),
                    None => Ok(Outcome::Outputs { calls: mixed.len() }),
                }
            }
        }
    }

    fn transmit(&mut self, frame: &SerialFrame) -> Result<Outcome, IoError> {
        match frame.port() {
            SerialPort::Rs485 => {
                self.serial.send_rs485(frame.data())?;
                info!(bytes = frame.data().len(), "RS485 frame sent");
                Ok(Outcome::Transmitted {
                    bytes: frame.data().len(),
                })
            }
            SerialPort::Can => {
                let max = self.serial.max_can_payload();
                let data = frame.data();
                let payload = &data[..data.len().min(max)];
                if payload.len() < data.len() {
                    warn!(
                        id = format_args!("0x{:X}", frame.can_id()),
                        len = data.len(),
                        max,
                        "CAN payload truncated"
                    );
                }
                self.serial
                    .send_can(frame.can_id(), frame.can_extended(), payload)?;
                info!(
                    id = format_args!("0x{:X}", frame.can_id()),
                    extended = frame.can_extended(),
                    bytes = payload.len(),
                    "CAN frame sent"
                );
                Ok(Outcome::Transmitted {
                    bytes: payload.len(),
                })
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Collaborator interfaces the engine drives.
//!
//! The engine never touches hardware directly.  It reads time from a
//! [`Clock`], drives relays through an [`OutputDriver`] and sends frames
//! through a [`SerialTransport`].  Board support code implements these; the
//! [`console`] module provides log-only host implementations.
//!
//! All calls are synchronous and assumed to complete in bounded time.

pub mod console;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use crate::datetime::DateTime;

/// Classic CAN carries at most eight data bytes per frame.
pub const CAN_CLASSIC_MAX_PAYLOAD: usize = 8;

// ── IoError ───────────────────────────────────────────────────────────────────

/// A hardware call failed.
///
/// Raised by collaborators; the executor logs it and carries on, so it never
/// propagates out of a firing.
#[derive(Debug, Error)]
pub enum IoError {
    /// The output expander rejected a write.  `channel` is `None` for a
    /// whole-bank write.
    #[error("digital output write failed (channel {channel:?})")]
    Output { channel: Option<u8> },

    /// The RS-485 or CAN transceiver rejected a transmission.
    #[error("{bus} transmission failed: {reason}")]
    Transport { bus: &'static str, reason: String },

    /// The RTC could not be read or programmed.
    #[error("real-time clock error: {0}")]
    Clock(String),
}

// ── Traits ────────────────────────────────────────────────────────────────────

/// Source of wall-clock time.
pub trait Clock {
    /// Current date and time.
    fn now(&self) -> DateTime;

    /// Reprogram the clock.
    fn set(&mut self, time: DateTime) -> Result<(), IoError>;
}

/// The 8-channel digital-output bank.
pub trait OutputDriver {
    /// Drive one channel (`0..8`); `true` = open/high.
    fn apply(&mut self, channel: u8, state: bool) -> Result<(), IoError>;

    /// Drive all eight channels at once; bit `i` is channel `i`.
    fn apply_all(&mut self, mask: u8) -> Result<(), IoError>;
}

/// The RS-485 and CAN transceivers.
pub trait SerialTransport {
    fn send_rs485(&mut self, bytes: &[u8]) -> Result<(), IoError>;

    fn send_can(&mut self, id: u32, extended: bool, payload: &[u8]) -> Result<(), IoError>;

    /// Largest CAN payload one frame can carry.  Longer payloads are cut to
    /// this length before [`send_can`](Self::send_can) is called.
    fn max_can_payload(&self) -> usize {
        CAN_CLASSIC_MAX_PAYLOAD
    }
}

//! Host implementations of the collaborator traits.
//!
//! Used by the `io-scheduler` binary when no board is attached: the clock is
//! the system's local time, and outputs and serial frames are only logged.

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use tracing::{info, warn};

use super::{Clock, IoError, OutputDriver, SerialTransport};
use crate::datetime::DateTime;

// ── SystemClock ───────────────────────────────────────────────────────────────

/// Local system time, shifted by whatever offset the last `set` introduced.
#[derive(Debug)]
pub struct SystemClock {
    offset: ChronoDuration,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            offset: ChronoDuration::zero(),
        }
    }

    fn local_now() -> NaiveDateTime {
        Local::now().naive_local()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        DateTime::from(Self::local_now() + self.offset)
    }

    fn set(&mut self, time: DateTime) -> Result<(), IoError> {
        let target = time
            .to_naive()
            .ok_or_else(|| IoError::Clock(format!("{time} is not a calendar date")))?;
        self.offset = target - Self::local_now();
        info!(now = %time, offset_s = self.offset.num_seconds(), "System clock adjusted");
        Ok(())
    }
}

// ── ConsoleOutputs ────────────────────────────────────────────────────────────

/// Output bank that only remembers and logs the requested levels.
#[derive(Debug, Default)]
pub struct ConsoleOutputs {
    state: u8,
}

impl ConsoleOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of every channel as a bitmask.
    pub fn state(&self) -> u8 {
        self.state
    }
}

impl OutputDriver for ConsoleOutputs {
    fn apply(&mut self, channel: u8, state: bool) -> Result<(), IoError> {
        if channel >= 8 {
            warn!(channel, "output channel out of range");
            return Err(IoError::Output {
                channel: Some(channel),
            });
        }
        if state {
            self.state |= 1 << channel;
        } else {
            self.state &= !(1 << channel);
        }
        info!(
            "|***  Dout CH{} {}  ***|",
            channel + 1,
            if state { "High" } else { "Low" }
        );
        Ok(())
    }

    fn apply_all(&mut self, mask: u8) -> Result<(), IoError> {
        self.state = mask;
        info!(mask = format_args!("{:#010b}", mask), "Dout bank written");
        Ok(())
    }
}

// ── ConsoleSerial ─────────────────────────────────────────────────────────────

/// Transceiver pair that logs every frame instead of sending it.
#[derive(Debug, Default)]
pub struct ConsoleSerial;

impl ConsoleSerial {
    pub fn new() -> Self {
        Self
    }
}

impl SerialTransport for ConsoleSerial {
    fn send_rs485(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        info!(len = bytes.len(), data = ?bytes, "RS485 send");
        Ok(())
    }

    fn send_can(&mut self, id: u32, extended: bool, payload: &[u8]) -> Result<(), IoError> {
        info!(
            id = format_args!("0x{:X}", id),
            extended,
            data = ?payload,
            "CAN send"
        );
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

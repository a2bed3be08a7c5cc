/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for the event manager.
//!
//! Every variant is returned synchronously to the front-end that called the
//! manager; none of them is logged-and-dropped.  Hardware failures during
//! execution use [`IoError`](crate::hal::IoError) instead and never reach
//! this type.

use thiserror::Error;

use crate::datetime::DateTimeField;

/// Error returned by [`EventManager`](super::EventManager) operations and by
/// the [`SerialFrame`](crate::event::SerialFrame) constructors.
///
/// | Variant | Raised by |
/// |---|---|
/// | `TableFull` | `create_*` when the reserved margin is reached |
/// | `NotFound` | `delete` / `set_enabled` with a bad sequence number |
/// | `InvalidTrigger` | `create_*` / `set_time` with an out-of-range field |
/// | `InvalidChannel` | `create_single_channel_event` with channel ≥ 8 |
/// | `InvalidPeriod` | `create_*` with a zero or overflowing interval |
/// | `InvalidCanId` | `SerialFrame::can` with an id beyond the frame format |
/// | `PayloadTooLarge` | `SerialFrame` constructors |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No free slot left.  One slot is always held in reserve, so this is
    /// raised once `count` reaches `capacity - 1`.
    #[error("event table is full ({count} of {capacity} slots used, one reserved)")]
    TableFull { count: usize, capacity: usize },

    /// The sequence number is `0` or beyond the populated range.
    #[error("no event with sequence number {sequence_number} (table holds {count})")]
    NotFound { sequence_number: u8, count: usize },

    /// The trigger time has a field outside its calendar range.
    #[error("invalid trigger time: {field}")]
    InvalidTrigger { field: DateTimeField },

    #[error("output channel index {channel} is out of range (0-7)")]
    InvalidChannel { channel: usize },

    /// Interval repetition with a zero period, or one that does not fit a
    /// `u32` millisecond count.
    #[error("interval period must be between 1 ms and {} ms", u32::MAX)]
    InvalidPeriod,

    #[error("CAN id 0x{id:X} does not fit a {} frame", frame_format(.extended))]
    InvalidCanId { id: u32, extended: bool },

    #[error("serial payload of {len} bytes exceeds the {max}-byte buffer")]
    PayloadTooLarge { len: usize, max: usize },
}

fn frame_format(extended: &bool) -> &'static str {
    if *extended {
        "29-bit extended"
    } else {
        "11-bit standard"
    }
}

impl From<DateTimeField> for EngineError {
    fn from(field: DateTimeField) -> Self {
        EngineError::InvalidTrigger { field }
    }
}

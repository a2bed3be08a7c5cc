/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core event data structures for the automation engine.
//!
//! A [`TimingEvent`] couples *when* (a [`DateTime`] plus a [`Repetition`])
//! with *what* (an [`ActionPayload`]):
//!
//! ```text
//! front-end  ──create_*()──►  TimingEvent  ──(calendar / ticker)──►  Executor  ──►  outputs / serial
//!                              ↑ owned by the event table
//! ```
//!
//! # Ownership model
//! Every event owns its payload outright, including the serial byte buffer.
//! The buffer moves into the table slot on creation and is dropped with the
//! slot on deletion.

use std::fmt;

use serde::Deserialize;

use crate::datetime::DateTime;
use crate::table::EngineError;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Number of digital-output channels on the board.
pub const DOUT_CHANNELS: usize = 8;

/// Largest serial payload an event may carry, in bytes.
pub const MAX_SERIAL_PAYLOAD: usize = 1000;

/// Highest 29-bit (extended) CAN identifier.
pub const CAN_MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Highest 11-bit (standard) CAN identifier.
pub const CAN_MAX_STANDARD_ID: u32 = 0x7FF;

// ── ChannelState ──────────────────────────────────────────────────────────────

/// Requested state of one digital-output channel.
///
/// `Retain` is an instruction, not a reading: the executor skips the channel
/// and whatever the hardware currently drives stays in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Open,
    Closed,
    #[default]
    Retain,
}

impl ChannelState {
    /// Level to drive, or `None` for `Retain`.
    pub fn level(self) -> Option<bool> {
        match self {
            ChannelState::Open => Some(true),
            ChannelState::Closed => Some(false),
            ChannelState::Retain => None,
        }
    }

    pub fn from_level(high: bool) -> Self {
        if high {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }
}

// ── Repetition ────────────────────────────────────────────────────────────────

/// Unit an interval repetition was expressed in.  Only used for display; the
/// period itself is always stored in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    pub fn millis(self) -> u32 {
        match self {
            IntervalUnit::Milliseconds => 1,
            IntervalUnit::Seconds => 1_000,
            IntervalUnit::Minutes => 60_000,
            IntervalUnit::Hours => 3_600_000,
        }
    }

    fn label(self) -> &'static str {
        match self {
            IntervalUnit::Milliseconds => "Milliseconds",
            IntervalUnit::Seconds => "Seconds",
            IntervalUnit::Minutes => "Minutes",
            IntervalUnit::Hours => "Hours",
        }
    }
}

/// Elapsed-time repetition served by the periodic ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub unit: IntervalUnit,
    /// Firing period in milliseconds.
    pub period_ms: u32,
    /// Time accumulated since the last firing.  Only the ticker writes this.
    pub elapsed_ms: u32,
}

/// How an event repeats.
///
/// Calendar kinds (`Once`, `Daily`, `Weekly`, `Monthly`) are matched against
/// wall-clock fields; `Every` is counted by the periodic ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    /// Fire once at the exact date and time, then delete.
    Once,
    /// Fire every `period_ms` milliseconds until deleted.
    Every(Interval),
    /// Fire at the time of day, every day.
    Daily,
    /// Fire at the time of day on the matching `day_of_week`.
    Weekly,
    /// Fire at the time of day on the matching day of month.
    Monthly,
}

impl Repetition {
    /// Interval repetition of `count` units.  A count that overflows the `u32`
    /// millisecond range becomes a zero period, which the table rejects.
    pub fn every(unit: IntervalUnit, count: u32) -> Self {
        let period_ms = count.checked_mul(unit.millis()).unwrap_or(0);
        Repetition::Every(Interval {
            unit,
            period_ms,
            elapsed_ms: 0,
        })
    }

    pub fn every_millis(ms: u32) -> Self {
        Self::every(IntervalUnit::Milliseconds, ms)
    }

    pub fn every_seconds(s: u32) -> Self {
        Self::every(IntervalUnit::Seconds, s)
    }

    pub fn every_minutes(m: u32) -> Self {
        Self::every(IntervalUnit::Minutes, m)
    }

    pub fn every_hours(h: u32) -> Self {
        Self::every(IntervalUnit::Hours, h)
    }

    /// `true` for the elapsed-time kinds served by the periodic ticker.
    pub fn is_periodic(&self) -> bool {
        matches!(self, Repetition::Every(_))
    }

    /// Period in milliseconds for the interval kind, `None` otherwise.
    pub fn period_ms(&self) -> Option<u32> {
        match self {
            Repetition::Every(i) => Some(i.period_ms),
            _ => None,
        }
    }
}

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repetition::Once => write!(f, "Aperiodicity"),
            Repetition::Every(i) => {
                write!(f, "{} {}", i.period_ms / i.unit.millis(), i.unit.label())
            }
            Repetition::Daily => write!(f, "Everyday"),
            Repetition::Weekly => write!(f, "Weekly"),
            Repetition::Monthly => write!(f, "Monthly"),
        }
    }
}

// ── Serial payload ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialPort {
    Rs485,
    Can,
}

/// How the payload was entered.  Affects display only; bytes are sent as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEncoding {
    #[default]
    Char,
    Hex,
}

/// A payload to transmit over RS-485 or CAN.
///
/// Construct through [`SerialFrame::rs485`] or [`SerialFrame::can`], which
/// enforce the payload bound and the CAN identifier range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialFrame {
    port: SerialPort,
    data: Vec<u8>,
    encoding: DataEncoding,
    can_id: u32,
    can_extended: bool,
}

impl SerialFrame {
    pub fn rs485(data: Vec<u8>, encoding: DataEncoding) -> Result<Self, EngineError> {
        check_payload(&data)?;
        Ok(Self {
            port: SerialPort::Rs485,
            data,
            encoding,
            can_id: 0,
            can_extended: false,
        })
    }

    /// CAN payloads are always entered as hex.
    ///
    /// A standard frame carries an 11-bit identifier, so `can_id` must not
    /// exceed [`CAN_MAX_STANDARD_ID`] (`0x7FF`) unless `extended` is set, in
    /// which case the 29-bit bound [`CAN_MAX_EXTENDED_ID`] applies.  Larger
    /// ids are rejected with [`EngineError::InvalidCanId`].
    pub fn can(can_id: u32, extended: bool, data: Vec<u8>) -> Result<Self, EngineError> {
        check_payload(&data)?;
        let max = if extended {
            CAN_MAX_EXTENDED_ID
        } else {
            CAN_MAX_STANDARD_ID
        };
        if can_id > max {
            return Err(EngineError::InvalidCanId { id: can_id, extended });
        }
        Ok(Self {
            port: SerialPort::Can,
            data,
            encoding: DataEncoding::Hex,
            can_id,
            can_extended: extended,
        })
    }

    pub fn port(&self) -> SerialPort {
        self.port
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn encoding(&self) -> DataEncoding {
        self.encoding
    }

    pub fn can_id(&self) -> u32 {
        self.can_id
    }

    pub fn can_extended(&self) -> bool {
        self.can_extended
    }
}

fn check_payload(data: &[u8]) -> Result<(), EngineError> {
    if data.len() > MAX_SERIAL_PAYLOAD {
        return Err(EngineError::PayloadTooLarge {
            len: data.len(),
            max: MAX_SERIAL_PAYLOAD,
        });
    }
    Ok(())
}

// ── ActionPayload ─────────────────────────────────────────────────────────────

/// What an event does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPayload {
    DoutVector { channels: [ChannelState; DOUT_CHANNELS] },
    Serial(SerialFrame),
}

impl ActionPayload {
    /// All channels `Retain` except `channel`.
    pub fn single_channel(channel: usize, state: ChannelState) -> Result<Self, EngineError> {
        if channel >= DOUT_CHANNELS {
            return Err(EngineError::InvalidChannel { channel });
        }
        let mut channels = [ChannelState::Retain; DOUT_CHANNELS];
        channels[channel] = state;
        Ok(ActionPayload::DoutVector { channels })
    }

    /// Every channel explicit: bit `i` set opens channel `i`.
    pub fn from_mask(mask: u8) -> Self {
        let mut channels = [ChannelState::Closed; DOUT_CHANNELS];
        for (i, ch) in channels.iter_mut().enumerate() {
            *ch = ChannelState::from_level((mask >> i) & 1 == 1);
        }
        ActionPayload::DoutVector { channels }
    }
}

// ── TimingEvent ───────────────────────────────────────────────────────────────

/// One slot of the event table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingEvent {
    pub enabled: bool,
    /// 1-based, always equal to the slot index + 1.
    pub sequence_number: u8,
    pub trigger_time: DateTime,
    pub repetition: Repetition,
    pub action: ActionPayload,
}

impl TimingEvent {
    /// `true` for an enabled event served by the periodic ticker.
    pub fn is_active_periodic(&self) -> bool {
        self.enabled && self.repetition.is_periodic()
    }

    /// Calendar match against the current clock reading.
    ///
    /// Interval events never match here.
    pub fn matches_calendar(&self, now: &DateTime) -> bool {
        if !self.enabled || !self.trigger_time.same_time_of_day(now) {
            return false;
        }
        match self.repetition {
            Repetition::Once => self.trigger_time.same_date(now),
            Repetition::Daily => true,
            Repetition::Weekly => self.trigger_time.day_of_week == now.day_of_week,
            Repetition::Monthly => self.trigger_time.day == now.day,
            Repetition::Every(_) => false,
        }
    }

    pub fn summary(&self) -> EventSummary<'_> {
        EventSummary(self)
    }
}

// ── EventSummary ──────────────────────────────────────────────────────────────

/// Human-readable rendering of an event for listings and logs.
pub struct EventSummary<'a>(&'a TimingEvent);

impl fmt::Display for EventSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ev = self.0;
        write!(f, "Event {} : {}", ev.sequence_number, ev.trigger_time)?;
        if !ev.enabled {
            write!(f, " (disabled)")?;
        }
        match &ev.action {
            ActionPayload::DoutVector { channels } => {
                let explicit: Vec<usize> = (0..DOUT_CHANNELS)
                    .filter(|&i| channels[i] != ChannelState::Retain)
                    .collect();
                if let [only] = explicit.as_slice() {
                    let word = if channels[*only] == ChannelState::Open {
                        "Open"
                    } else {
                        "Closed"
                    };
                    write!(f, "  CH{} {}", only + 1, word)?;
                } else {
                    write!(f, "\n    CHx   :")?;
                    for i in 0..DOUT_CHANNELS {
                        write!(f, " CH{:<6}", i + 1)?;
                    }
                    write!(f, "\n    State :")?;
                    for ch in channels {
                        let word = match ch {
                            ChannelState::Open => "HIGH",
                            ChannelState::Closed => "LOW",
                            ChannelState::Retain => "Retain",
                        };
                        write!(f, " {:<8}", word)?;
                    }
                    write!(f, "\n   ")?;
                }
            }
            ActionPayload::Serial(frame) => {
                match frame.port() {
                    SerialPort::Rs485 => write!(f, "  RS485")?,
                    SerialPort::Can => write!(
                        f,
                        "  CAN {} 0x{:X}",
                        if frame.can_extended() {
                            "Extended"
                        } else {
                            "Standard"
                        },
                        frame.can_id()
                    )?,
                }
                match frame.encoding() {
                    DataEncoding::Char => {
                        write!(f, " (char): {}", String::from_utf8_lossy(frame.data()))?
                    }
                    DataEncoding::Hex => {
                        write!(f, " (hex):")?;
                        for b in frame.data() {
                            write!(f, " 0x{:02X}", b)?;
                        }
                    }
                }
            }
        }
        write!(f, "  ----- {}", ev.repetition)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn event(repetition: Repetition, action: ActionPayload) -> TimingEvent {
        TimingEvent {
            enabled: true,
            sequence_number: 1,
            trigger_time: DateTime::new(2026, 10, 14, 3, 9, 0, 0),
            repetition,
            action,
        }
    }

    // ── ChannelState ──────────────────────────────────────────────────────────

    #[test]
    fn channel_state_levels() {
        assert_eq!(ChannelState::Open.level(), Some(true));
        assert_eq!(ChannelState::Closed.level(), Some(false));
        assert_eq!(ChannelState::Retain.level(), None);
    }

    // ── Repetition ────────────────────────────────────────────────────────────

    #[test]
    fn interval_constructors_convert_to_milliseconds() {
        assert_eq!(Repetition::every_millis(250).period_ms(), Some(250));
        assert_eq!(Repetition::every_seconds(5).period_ms(), Some(5_000));
        assert_eq!(Repetition::every_minutes(2).period_ms(), Some(120_000));
        assert_eq!(Repetition::every_hours(1).period_ms(), Some(3_600_000));
        assert_eq!(Repetition::Daily.period_ms(), None);
    }

    #[test]
    fn interval_overflow_collapses_to_zero_period() {
        assert_eq!(Repetition::every_hours(u32::MAX).period_ms(), Some(0));
    }

    #[test]
    fn repetition_display_uses_entered_unit() {
        assert_eq!(Repetition::every_seconds(5).to_string(), "5 Seconds");
        assert_eq!(Repetition::every_hours(3).to_string(), "3 Hours");
        assert_eq!(Repetition::Once.to_string(), "Aperiodicity");
        assert_eq!(Repetition::Weekly.to_string(), "Weekly");
    }

    // ── ActionPayload ─────────────────────────────────────────────────────────

    #[test]
    fn single_channel_retains_everything_else() {
        let ActionPayload::DoutVector { channels } =
            ActionPayload::single_channel(2, ChannelState::Open).unwrap()
        else {
            panic!("expected a dout vector");
        };
        for (i, ch) in channels.iter().enumerate() {
            if i == 2 {
                assert_eq!(*ch, ChannelState::Open);
            } else {
                assert_eq!(*ch, ChannelState::Retain);
            }
        }
    }

    #[test]
    fn single_channel_out_of_range_is_rejected() {
        assert_eq!(
            ActionPayload::single_channel(8, ChannelState::Open),
            Err(EngineError::InvalidChannel { channel: 8 })
        );
    }

    #[test]
    fn mask_sets_every_channel_explicitly() {
        let ActionPayload::DoutVector { channels } = ActionPayload::from_mask(0b1000_0101) else {
            panic!("expected a dout vector");
        };
        assert_eq!(channels[0], ChannelState::Open);
        assert_eq!(channels[1], ChannelState::Closed);
        assert_eq!(channels[2], ChannelState::Open);
        assert_eq!(channels[7], ChannelState::Open);
        assert!(!channels.contains(&ChannelState::Retain));
    }

    // ── SerialFrame ───────────────────────────────────────────────────────────

    #[test]
    fn can_id_above_29_bits_is_rejected() {
        let err = SerialFrame::can(0x2000_0000, true, vec![1]).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidCanId {
                id: 0x2000_0000,
                extended: true
            }
        );
        assert!(SerialFrame::can(CAN_MAX_EXTENDED_ID, true, vec![1]).is_ok());
    }

    #[test]
    fn standard_can_id_is_limited_to_11_bits() {
        assert!(SerialFrame::can(0x7FF, false, vec![]).is_ok());
        assert!(matches!(
            SerialFrame::can(0x800, false, vec![]),
            Err(EngineError::InvalidCanId { .. })
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let err = SerialFrame::rs485(vec![0; MAX_SERIAL_PAYLOAD + 1], DataEncoding::Hex)
            .unwrap_err();
        assert!(matches!(err, EngineError::PayloadTooLarge { len: 1001, .. }));
        assert!(SerialFrame::rs485(vec![0; MAX_SERIAL_PAYLOAD], DataEncoding::Hex).is_ok());
    }

    // ── Calendar matching ─────────────────────────────────────────────────────

    #[test]
    fn once_requires_full_date() {
        let ev = event(Repetition::Once, ActionPayload::from_mask(0));
        assert!(ev.matches_calendar(&DateTime::new(2026, 10, 14, 3, 9, 0, 0)));
        assert!(!ev.matches_calendar(&DateTime::new(2026, 10, 15, 4, 9, 0, 0)));
    }

    #[test]
    fn weekly_and_monthly_checks() {
        let weekly = event(Repetition::Weekly, ActionPayload::from_mask(0));
        assert!(weekly.matches_calendar(&DateTime::new(2026, 10, 21, 3, 9, 0, 0)));
        assert!(!weekly.matches_calendar(&DateTime::new(2026, 10, 22, 4, 9, 0, 0)));

        let monthly = event(Repetition::Monthly, ActionPayload::from_mask(0));
        assert!(monthly.matches_calendar(&DateTime::new(2026, 11, 14, 6, 9, 0, 0)));
        assert!(!monthly.matches_calendar(&DateTime::new(2026, 11, 15, 0, 9, 0, 0)));
    }

    #[test]
    fn interval_and_disabled_events_never_calendar_match() {
        let now = DateTime::new(2026, 10, 14, 3, 9, 0, 0);
        let periodic = event(Repetition::every_seconds(1), ActionPayload::from_mask(0));
        assert!(!periodic.matches_calendar(&now));

        let mut daily = event(Repetition::Daily, ActionPayload::from_mask(0));
        daily.enabled = false;
        assert!(!daily.matches_calendar(&now));
    }

    // ── EventSummary ──────────────────────────────────────────────────────────

    #[test]
    fn summary_single_channel() {
        let ev = event(
            Repetition::Weekly,
            ActionPayload::single_channel(2, ChannelState::Open).unwrap(),
        );
        assert_eq!(
            ev.summary().to_string(),
            "Event 1 : 2026-10-14 09:00:00 Wed  CH3 Open  ----- Weekly"
        );
    }

    #[test]
    fn summary_can_frame_hex() {
        let frame = SerialFrame::can(0x123, false, vec![0x01, 0xAB]).unwrap();
        let ev = event(Repetition::every_seconds(5), ActionPayload::Serial(frame));
        let s = ev.summary().to_string();
        assert!(s.contains("CAN Standard 0x123 (hex): 0x01 0xAB"), "{s}");
        assert!(s.ends_with("----- 5 Seconds"), "{s}");
    }

    #[test]
    fn summary_vector_lists_every_channel() {
        let ev = event(Repetition::Daily, ActionPayload::from_mask(0b0000_0001));
        let s = ev.summary().to_string();
        assert!(s.contains("HIGH"));
        assert_eq!(s.matches("LOW").count(), 7);
    }
}

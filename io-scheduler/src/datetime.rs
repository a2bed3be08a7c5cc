/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Calendar date and time as reported by the real-time clock.
//!
//! [`DateTime`] is a plain value type: the clock produces it, events copy it
//! at creation time, and the calendar evaluator compares its fields.  No time
//! zone or leap handling lives here; the RTC chip is the source of truth.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

// ── DateTimeField ─────────────────────────────────────────────────────────────

/// Which field of a [`DateTime`] is out of range, and the offending value.
///
/// Carried inside [`EngineError::InvalidTrigger`] so callers know exactly
/// what to fix.
///
/// [`EngineError::InvalidTrigger`]: crate::table::EngineError::InvalidTrigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeField {
    Month(u8),
    Day(u8),
    DayOfWeek(u8),
    Hour(u8),
    Minute(u8),
    Second(u8),
}

impl fmt::Display for DateTimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTimeField::Month(v) => write!(f, "month {} is outside 1-12", v),
            DateTimeField::Day(v) => write!(f, "day {} is outside 1-31", v),
            DateTimeField::DayOfWeek(v) => write!(f, "day of week {} is outside 0-6", v),
            DateTimeField::Hour(v) => write!(f, "hour {} is outside 0-23", v),
            DateTimeField::Minute(v) => write!(f, "minute {} is outside 0-59", v),
            DateTimeField::Second(v) => write!(f, "second {} is outside 0-59", v),
        }
    }
}

// ── DateTime ──────────────────────────────────────────────────────────────────

/// Wall-clock date and time with an explicit day of week.
///
/// `day_of_week` uses the RTC numbering: `0` = Sunday … `6` = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub year: u16,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 0-6, Sunday first
    pub day_of_week: u8,
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// 0-59
    pub second: u8,
}

impl DateTime {
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        day_of_week: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Self {
        Self {
            year,
            month,
            day,
            day_of_week,
            hour,
            minute,
            second,
        }
    }

    /// Check every field against its calendar range.
    ///
    /// Only ranges are checked; `day = 31` in a 30-day month is accepted,
    /// matching what the RTC chip itself accepts.
    pub fn validate(&self) -> Result<(), DateTimeField> {
        if !(1..=12).contains(&self.month) {
            return Err(DateTimeField::Month(self.month));
        }
        if !(1..=31).contains(&self.day) {
            return Err(DateTimeField::Day(self.day));
        }
        if self.day_of_week > 6 {
            return Err(DateTimeField::DayOfWeek(self.day_of_week));
        }
        if self.hour > 23 {
            return Err(DateTimeField::Hour(self.hour));
        }
        if self.minute > 59 {
            return Err(DateTimeField::Minute(self.minute));
        }
        if self.second > 59 {
            return Err(DateTimeField::Second(self.second));
        }
        Ok(())
    }

    /// `true` when hour, minute and second are equal.
    pub fn same_time_of_day(&self, other: &DateTime) -> bool {
        self.hour == other.hour && self.minute == other.minute && self.second == other.second
    }

    /// `true` when year, month and day are equal.
    pub fn same_date(&self, other: &DateTime) -> bool {
        self.year == other.year && self.month == other.month && self.day == other.day
    }

    /// Short English weekday name, or `"???"` for an out-of-range value.
    pub fn weekday_name(&self) -> &'static str {
        WEEKDAY_NAMES
            .get(self.day_of_week as usize)
            .copied()
            .unwrap_or("???")
    }

    /// Convert to a `chrono` timestamp.  Returns `None` when the fields do not
    /// name a real calendar date.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }
}

impl From<NaiveDateTime> for DateTime {
    fn from(t: NaiveDateTime) -> Self {
        Self {
            year: t.year().clamp(0, u16::MAX as i32) as u16,
            month: t.month() as u8,
            day: t.day() as u8,
            day_of_week: t.weekday().num_days_from_sunday() as u8,
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: t.second() as u8,
        }
    }
}

impl Default for DateTime {
    /// 2000-01-01 00:00:00, a Saturday.
    fn default() -> Self {
        Self::new(2000, 1, 1, 6, 0, 0, 0)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} {}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.weekday_name()
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

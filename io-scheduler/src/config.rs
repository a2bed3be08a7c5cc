//! Engine configuration and seed events loaded from YAML.
//!
//! The expected YAML structure is:
//! ```yaml
//! calendar_poll_ms: 100
//! capacity: 10
//! events:
//!   - time: { year: 2026, month: 10, day: 14, day_of_week: 3, hour: 9, minute: 0, second: 0 }
//!     repeat: weekly
//!     outputs: [open, retain, retain, retain, retain, retain, retain, closed]
//!   - time: { hour: 7 }
//!     repeat: daily
//!     channel: 2
//!     state: open
//!   - time: {}
//!     repeat: seconds
//!     every: 5
//!     serial: { port: can, can_id: 0x123, extended: false, data: "01 02 03" }
//! ```
//!
//! Each event carries exactly one of `outputs`, `channel` (with `state`),
//! `mask` or `serial`.  `every` is required for the interval kinds
//! (`milliseconds`, `seconds`, `minutes`, `hours`) and counts in that unit.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::datetime::DateTime;
use crate::engine::{EngineOptions, DEFAULT_CALENDAR_POLL};
use crate::event::{
    ActionPayload, ChannelState, DataEncoding, IntervalUnit, Repetition, SerialFrame, SerialPort,
    DOUT_CHANNELS,
};
use crate::table::{EngineError, MAX_EVENTS};

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    calendar_poll_ms: Option<u64>,
    capacity: Option<usize>,
    #[serde(default)]
    events: Vec<EventEntry>,
}

/// Trigger time.  Date fields default to 2000-01-01 (day of week 0), which
/// only matters for `once`, `weekly` and `monthly` events.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeEntry {
    #[serde(default = "default_year")]
    year: u16,
    #[serde(default = "one")]
    month: u8,
    #[serde(default = "one")]
    day: u8,
    #[serde(default)]
    day_of_week: u8,
    #[serde(default)]
    hour: u8,
    #[serde(default)]
    minute: u8,
    #[serde(default)]
    second: u8,
}

fn default_year() -> u16 {
    2000
}

fn one() -> u8 {
    1
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RepeatKind {
    Once,
    Daily,
    Weekly,
    Monthly,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventEntry {
    time: TimeEntry,
    repeat: RepeatKind,
    every: Option<u32>,
    outputs: Option<Vec<ChannelState>>,
    channel: Option<usize>,
    state: Option<ChannelState>,
    mask: Option<u8>,
    serial: Option<SerialEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SerialEntry {
    port: SerialPort,
    #[serde(default)]
    can_id: u32,
    #[serde(default)]
    extended: bool,
    #[serde(default)]
    encoding: DataEncoding,
    data: String,
}

// ── Public data structures ────────────────────────────────────────────────────

/// One event to create at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSeed {
    pub time: DateTime,
    pub repetition: Repetition,
    pub action: ActionPayload,
}

/// Engine options plus the events to seed the table with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub options: EngineOptions,
    pub events: Vec<EventSeed>,
}

impl EngineConfig {
    /// Parse `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is malformed,
    /// or any event fails validation.  Event errors name the 1-based index
    /// of the offending entry.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading engine configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        let calendar_poll = match file.calendar_poll_ms {
            Some(0) => bail!("calendar_poll_ms must be at least 1"),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_CALENDAR_POLL,
        };
        let capacity = file.capacity.unwrap_or(MAX_EVENTS);
        ensure!(
            (2..=usize::from(u8::MAX)).contains(&capacity),
            "capacity {capacity} is outside 2-255"
        );
        if file.events.len() >= capacity {
            warn!(
                events = file.events.len(),
                capacity, "More seed events than free slots; the excess will be rejected"
            );
        }

        let events = file
            .events
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let seed = entry
                    .into_seed()
                    .with_context(|| format!("event #{}", i + 1))?;
                debug!(index = i + 1, time = %seed.time, repetition = %seed.repetition, "Seed event");
                Ok(seed)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            calendar_poll_ms = calendar_poll.as_millis() as u64,
            capacity,
            events = events.len(),
            "Engine configuration loaded"
        );
        Ok(Self {
            options: EngineOptions {
                capacity,
                calendar_poll,
            },
            events,
        })
    }
}

// ── Conversion ────────────────────────────────────────────────────────────────

impl TimeEntry {
    fn into_datetime(self) -> Result<DateTime> {
        let time = DateTime::new(
            self.year,
            self.month,
            self.day,
            self.day_of_week,
            self.hour,
            self.minute,
            self.second,
        );
        time.validate().map_err(EngineError::from)?;
        Ok(time)
    }
}

impl RepeatKind {
    fn interval_unit(self) -> Option<IntervalUnit> {
        match self {
            RepeatKind::Milliseconds => Some(IntervalUnit::Milliseconds),
            RepeatKind::Seconds => Some(IntervalUnit::Seconds),
            RepeatKind::Minutes => Some(IntervalUnit::Minutes),
            RepeatKind::Hours => Some(IntervalUnit::Hours),
            _ => None,
        }
    }

    fn into_repetition(self, every: Option<u32>) -> Result<Repetition> {
        if let Some(unit) = self.interval_unit() {
            let count = every.ok_or_else(|| anyhow!("`every` is required for {self:?} repetition"))?;
            let repetition = Repetition::every(unit, count);
            if repetition.period_ms() == Some(0) {
                return Err(EngineError::InvalidPeriod.into());
            }
            return Ok(repetition);
        }
        if every.is_some() {
            warn!(repeat = ?self, "`every` ignored for calendar repetition");
        }
        Ok(match self {
            RepeatKind::Once => Repetition::Once,
            RepeatKind::Daily => Repetition::Daily,
            RepeatKind::Weekly => Repetition::Weekly,
            _ => Repetition::Monthly,
        })
    }
}

impl EventEntry {
    fn into_seed(self) -> Result<EventSeed> {
        let time = self.time.into_datetime()?;
        let repetition = self.repeat.into_repetition(self.every)?;

        if self.state.is_some() && self.channel.is_none() {
            bail!("`state` is only valid together with `channel`");
        }

        let action = match (self.outputs, self.channel, self.mask, self.serial) {
            (Some(outputs), None, None, None) => {
                let channels: [ChannelState; DOUT_CHANNELS] =
                    outputs.try_into().map_err(|v: Vec<ChannelState>| {
                        anyhow!("`outputs` needs {DOUT_CHANNELS} entries, found {}", v.len())
                    })?;
                ActionPayload::DoutVector { channels }
            }
            (None, Some(channel), None, None) => {
                let state = self
                    .state
                    .ok_or_else(|| anyhow!("`channel` requires a `state`"))?;
                ActionPayload::single_channel(channel, state)?
            }
            (None, None, Some(mask), None) => ActionPayload::from_mask(mask),
            (None, None, None, Some(serial)) => ActionPayload::Serial(serial.into_frame()?),
            _ => bail!("exactly one of `outputs`, `channel`, `mask` or `serial` is required"),
        };

        Ok(EventSeed {
            time,
            repetition,
            action,
        })
    }
}

impl SerialEntry {
    fn into_frame(self) -> Result<SerialFrame> {
        let frame = match self.port {
            SerialPort::Rs485 => {
                let bytes = match self.encoding {
                    DataEncoding::Char => self.data.into_bytes(),
                    DataEncoding::Hex => parse_hex_bytes(&self.data)?,
                };
                SerialFrame::rs485(bytes, self.encoding)?
            }
            SerialPort::Can => {
                if self.encoding == DataEncoding::Char {
                    debug!("CAN payload is always hex; `encoding` ignored");
                }
                SerialFrame::can(self.can_id, self.extended, parse_hex_bytes(&self.data)?)?
            }
        };
        Ok(frame)
    }
}

/// Parse whitespace-separated hex bytes such as `"01 ab 0xFF"`.
fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    text.split_whitespace()
        .map(|tok| {
            let digits = tok
                .strip_prefix("0x")
                .or_else(|| tok.strip_prefix("0X"))
                .unwrap_or(tok);
            u8::from_str_radix(digits, 16).with_context(|| format!("`{tok}` is not a hex byte"))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

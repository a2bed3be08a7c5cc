//! Fixed-capacity event table and the manager that mutates it.
//!
//! [`EventManager`] owns the table and the derived shared tick period.  It is
//! the only place events are created or destroyed; the periodic ticker may
//! additionally advance interval accumulators through
//! [`EventManager::events_mut`].
//!
//! # Invariants
//!
//! | Invariant | Maintained by |
//! |---|---|
//! | Populated slots are exactly `[0, len)` | `insert` appends, `delete` shifts down |
//! | `sequence_number == index + 1` | renumbering in `delete` |
//! | `len() < capacity()` (one slot reserved) | capacity check in `insert` |
//! | `gcd_period_ms()` equals the GCD of enabled interval periods | `refresh_tick_period` after every mutation |
//!
//! # Example
//! ```rust
//! use io_scheduler::datetime::DateTime;
//! use io_scheduler::event::{ChannelState, Repetition};
//! use io_scheduler::table::EventManager;
//!
//! let mut mgr = EventManager::new();
//! let at = DateTime::new(2026, 10, 14, 3, 9, 0, 0);
//! let seq = mgr
//!     .create_single_channel_event(at, 2, ChannelState::Open, Repetition::every_millis(200))
//!     .unwrap();
//! assert_eq!(seq, 1);
//! assert_eq!(mgr.gcd_period_ms(), 200);
//! ```

pub mod error;

pub use error::EngineError;

use tracing::{debug, info, warn};

use crate::datetime::DateTime;
use crate::event::{
    ActionPayload, ChannelState, EventSummary, Repetition, SerialFrame, TimingEvent, DOUT_CHANNELS,
};
use crate::period::TickPeriodInfo;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Number of slots in the event table.
///
/// One slot is held in reserve, so at most `MAX_EVENTS - 1` events exist at
/// any time.
pub const MAX_EVENTS: usize = 10;

// ── EventManager ──────────────────────────────────────────────────────────────

/// The event table plus its shared tick period.
#[derive(Debug)]
pub struct EventManager {
    /// Populated slots, in sequence order.  `len()` is the table `count`.
    events: Vec<TimingEvent>,

    /// Total slots, including the reserved one.
    capacity: usize,

    /// GCD of all enabled interval periods; `0` when there are none.
    gcd_period_ms: u32,
}

impl EventManager {
    /// Create an empty table with [`MAX_EVENTS`] slots.
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    /// Create an empty table with a custom slot count.
    ///
    /// The count is clamped to `u8::MAX` so every sequence number fits.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(u8::MAX as usize);
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            gcd_period_ms: 0,
        }
    }

    // ── Creation ──────────────────────────────────────────────────────────────

    /// Add an event that drives the full 8-channel vector.
    ///
    /// Returns the new event's sequence number.
    pub fn create_dout_event(
        &mut self,
        time: DateTime,
        channels: [ChannelState; DOUT_CHANNELS],
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        self.insert(time, repetition, ActionPayload::DoutVector { channels })
    }

    /// Add an event that changes one channel and retains the other seven.
    pub fn create_single_channel_event(
        &mut self,
        time: DateTime,
        channel: usize,
        state: ChannelState,
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        let action = ActionPayload::single_channel(channel, state)?;
        self.insert(time, repetition, action)
    }

    /// Add an event that sets all eight channels from a bitmask
    /// (bit `i` set ⇒ channel `i` open).
    pub fn create_mask_event(
        &mut self,
        time: DateTime,
        mask: u8,
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        self.insert(time, repetition, ActionPayload::from_mask(mask))
    }

    /// Add an event that transmits a serial or CAN frame.
    pub fn create_serial_event(
        &mut self,
        time: DateTime,
        frame: SerialFrame,
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        self.insert(time, repetition, ActionPayload::Serial(frame))
    }

    /// Validate and append a new event.  All `create_*` operations end here.
    pub fn insert(
        &mut self,
        time: DateTime,
        repetition: Repetition,
        action: ActionPayload,
    ) -> Result<u8, EngineError> {
        time.validate()?;
        if let Some(period) = repetition.period_ms() {
            if period == 0 {
                return Err(EngineError::InvalidPeriod);
            }
        }
        if self.events.len() + 1 >= self.capacity {
            warn!(
                count = self.events.len(),
                capacity = self.capacity,
                "event table is full"
            );
            return Err(EngineError::TableFull {
                count: self.events.len(),
                capacity: self.capacity,
            });
        }

        let sequence_number = (self.events.len() + 1) as u8;
        // Interval accumulators always start from zero.
        let repetition = match repetition {
            Repetition::Every(mut interval) => {
                interval.elapsed_ms = 0;
                Repetition::Every(interval)
            }
            other => other,
        };
        self.events.push(TimingEvent {
            enabled: true,
            sequence_number,
            trigger_time: time,
            repetition,
            action,
        });

        if let Some(ev) = self.events.last() {
            info!("New timing event {}", ev.summary());
        }

        if repetition.is_periodic() {
            self.refresh_tick_period();
        }
        Ok(sequence_number)
    }

    // ── Deletion ──────────────────────────────────────────────────────────────

    /// Remove the event with `sequence_number` and compact the table.
    ///
    /// Later events move down one slot and their sequence numbers drop by one,
    /// so numbers stay contiguous.  The removed event, including any serial
    /// buffer it owns, is dropped here.
    pub fn delete(&mut self, sequence_number: u8) -> Result<(), EngineError> {
        let index = self.index_of(sequence_number)?;
        let removed = self.events.remove(index);
        for ev in &mut self.events[index..] {
            ev.sequence_number -= 1;
        }

        info!(
            sequence_number,
            remaining = self.events.len(),
            "Deleted timing event"
        );

        if removed.repetition.is_periodic() {
            self.refresh_tick_period();
        }
        Ok(())
    }

    // ── Enable / disable ──────────────────────────────────────────────────────

    /// Enable or disable an event in place.
    ///
    /// Disabled events are skipped by both evaluators and do not contribute
    /// to the shared tick period.
    pub fn set_enabled(&mut self, sequence_number: u8, enabled: bool) -> Result<(), EngineError> {
        let index = self.index_of(sequence_number)?;
        let ev = &mut self.events[index];
        if ev.enabled == enabled {
            return Ok(());
        }
        ev.enabled = enabled;
        let periodic = ev.repetition.is_periodic();
        info!(sequence_number, enabled, "Timing event toggled");
        if periodic {
            self.refresh_tick_period();
        }
        Ok(())
    }

    // ── Tick period ───────────────────────────────────────────────────────────

    /// Recompute the shared tick period from the enabled interval events.
    ///
    /// Returns the new value.  Called automatically after every mutation that
    /// touches the periodic set.
    pub fn refresh_tick_period(&mut self) -> u32 {
        let info = TickPeriodInfo::from_events(&self.events);
        if info.period_ms != self.gcd_period_ms {
            if info.is_idle() {
                info!(
                    previous_ms = self.gcd_period_ms,
                    "No enabled interval events, periodic ticker idle"
                );
            } else {
                info!(
                    previous_ms = self.gcd_period_ms,
                    period_ms = info.period_ms,
                    periods = ?info.unique_periods,
                    periodic_events = info.event_count,
                    "Shared tick period recalculated"
                );
            }
        } else {
            debug!(period_ms = info.period_ms, "Shared tick period unchanged");
        }
        self.gcd_period_ms = info.period_ms;
        self.gcd_period_ms
    }

    /// Current shared tick period in milliseconds; `0` when no enabled
    /// interval event exists.
    pub fn gcd_period_ms(&self) -> u32 {
        self.gcd_period_ms
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    pub fn get(&self, sequence_number: u8) -> Option<&TimingEvent> {
        self.index_of(sequence_number)
            .ok()
            .map(|index| &self.events[index])
    }

    /// All populated slots, in sequence order.
    pub fn events(&self) -> &[TimingEvent] {
        &self.events
    }

    /// Mutable slots for the periodic ticker's accumulators.
    ///
    /// A slice cannot change length, so the table invariants survive any use
    /// of it; callers must not touch fields other than interval `elapsed_ms`.
    pub(crate) fn events_mut(&mut self) -> &mut [TimingEvent] {
        &mut self.events
    }

    /// `(sequence_number, summary)` for every event, in sequence order.
    pub fn list(&self) -> impl Iterator<Item = (u8, EventSummary<'_>)> + '_ {
        self.events.iter().map(|e| (e.sequence_number, e.summary()))
    }

    /// Number of populated slots (the table `count`).
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index_of(&self, sequence_number: u8) -> Result<usize, EngineError> {
        let n = sequence_number as usize;
        if n == 0 || n > self.events.len() {
            return Err(EngineError::NotFound {
                sequence_number,
                count: self.events.len(),
            });
        }
        Ok(n - 1)
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTimeField;
    use crate::event::DataEncoding;
    use crate::period::math::gcd_of;
    use proptest::prelude::*;

    fn at(hour: u8, minute: u8, second: u8) -> DateTime {
        DateTime::new(2026, 10, 14, 3, hour, minute, second)
    }

    fn assert_contiguous(mgr: &EventManager) {
        for (i, ev) in mgr.events().iter().enumerate() {
            assert_eq!(ev.sequence_number as usize, i + 1, "slot {i}");
        }
    }

    // ── create ────────────────────────────────────────────────────────────────

    #[test]
    fn create_assigns_sequential_numbers() {
        let mut mgr = EventManager::new();
        assert_eq!(mgr.create_mask_event(at(1, 0, 0), 0xFF, Repetition::Daily), Ok(1));
        assert_eq!(mgr.create_mask_event(at(2, 0, 0), 0x00, Repetition::Daily), Ok(2));
        assert_eq!(mgr.len(), 2);
        assert!(mgr.get(2).unwrap().enabled);
        assert_contiguous(&mgr);
    }

    #[test]
    fn dout_event_stores_vector_as_given() {
        let mut mgr = EventManager::new();
        let mut channels = [ChannelState::Retain; DOUT_CHANNELS];
        channels[0] = ChannelState::Open;
        channels[5] = ChannelState::Closed;
        let seq = mgr
            .create_dout_event(at(6, 30, 0), channels, Repetition::Monthly)
            .unwrap();
        let ev = mgr.get(seq).unwrap();
        assert_eq!(ev.action, ActionPayload::DoutVector { channels });
        assert_eq!(ev.repetition, Repetition::Monthly);
        assert_eq!(mgr.gcd_period_ms(), 0);
    }

    #[test]
    fn capacity_reserves_one_slot() {
        let mut mgr = EventManager::new();
        for i in 0..(MAX_EVENTS - 1) {
            mgr.create_mask_event(at(i as u8, 0, 0), 0, Repetition::Daily)
                .unwrap();
        }
        assert_eq!(mgr.len(), 9);
        let err = mgr
            .create_mask_event(at(12, 0, 0), 0, Repetition::Daily)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::TableFull {
                count: 9,
                capacity: 10
            }
        );
        assert_eq!(mgr.len(), 9, "rejected creation must not change the table");
    }

    #[test]
    fn invalid_trigger_time_is_rejected() {
        let mut mgr = EventManager::new();
        let bad = DateTime {
            hour: 24,
            ..at(0, 0, 0)
        };
        let err = mgr
            .create_single_channel_event(bad, 0, ChannelState::Open, Repetition::Once)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTrigger {
                field: DateTimeField::Hour(24)
            }
        );
        assert!(mgr.is_empty());
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut mgr = EventManager::new();
        let err = mgr
            .create_mask_event(at(0, 0, 0), 1, Repetition::every_seconds(0))
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidPeriod);
    }

    #[test]
    fn serial_event_owns_its_payload() {
        let mut mgr = EventManager::new();
        let frame = SerialFrame::rs485(b"hello".to_vec(), DataEncoding::Char).unwrap();
        let seq = mgr
            .create_serial_event(at(0, 0, 0), frame, Repetition::Once)
            .unwrap();
        match &mgr.get(seq).unwrap().action {
            ActionPayload::Serial(f) => assert_eq!(f.data(), b"hello"),
            other => panic!("unexpected action {other:?}"),
        }
    }

    // ── delete ────────────────────────────────────────────────────────────────

    #[test]
    fn delete_compacts_and_renumbers() {
        let mut mgr = EventManager::new();
        for h in 1..=5 {
            mgr.create_mask_event(at(h, 0, 0), h, Repetition::Daily)
                .unwrap();
        }
        mgr.delete(3).unwrap();

        assert_eq!(mgr.len(), 4);
        assert_contiguous(&mgr);
        // Former event 4 (hour 4) is now event 3, former 5 is now 4.
        assert_eq!(mgr.get(3).unwrap().trigger_time.hour, 4);
        assert_eq!(mgr.get(4).unwrap().trigger_time.hour, 5);
        assert!(mgr.get(5).is_none());
    }

    #[test]
    fn delete_out_of_range_is_not_found() {
        let mut mgr = EventManager::new();
        mgr.create_mask_event(at(1, 0, 0), 0, Repetition::Daily)
            .unwrap();
        assert!(matches!(mgr.delete(0), Err(EngineError::NotFound { .. })));
        assert!(matches!(mgr.delete(2), Err(EngineError::NotFound { .. })));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn freed_slot_can_be_reused() {
        let mut mgr = EventManager::new();
        for i in 0..9 {
            mgr.create_mask_event(at(i, 0, 0), 0, Repetition::Daily)
                .unwrap();
        }
        mgr.delete(1).unwrap();
        assert_eq!(
            mgr.create_mask_event(at(20, 0, 0), 0, Repetition::Daily),
            Ok(9)
        );
        assert_contiguous(&mgr);
    }

    #[derive(Debug, Clone)]
    enum Op {
        /// `None` creates a calendar event.
        Create(Option<u32>),
        Delete(u8),
        SetEnabled(u8, bool),
    }

    fn op() -> impl Strategy<Value = Op> {
        let period = prop::sample::select(vec![100u32, 200, 300, 500, 1_000, 1_500]);
        prop_oneof![
            3 => prop::option::of(period).prop_map(Op::Create),
            2 => (1u8..=10).prop_map(Op::Delete),
            2 => (1u8..=10, any::<bool>()).prop_map(|(n, on)| Op::SetEnabled(n, on)),
        ]
    }

    proptest! {
        #[test]
        fn random_mutations_keep_table_invariants(ops in prop::collection::vec(op(), 1..200)) {
            let mut mgr = EventManager::new();
            for op in ops {
                match op {
                    Op::Create(period) => {
                        let repetition = match period {
                            Some(ms) => Repetition::every_millis(ms),
                            None => Repetition::Daily,
                        };
                        let full = mgr.len() + 1 >= mgr.capacity();
                        let created = mgr.create_mask_event(at(0, 0, 0), 0x01, repetition);
                        prop_assert_eq!(created.is_err(), full);
                    }
                    Op::Delete(n) => {
                        let exists = usize::from(n) <= mgr.len();
                        prop_assert_eq!(mgr.delete(n).is_ok(), exists);
                    }
                    Op::SetEnabled(n, on) => {
                        let exists = usize::from(n) <= mgr.len();
                        prop_assert_eq!(mgr.set_enabled(n, on).is_ok(), exists);
                    }
                }

                for (i, ev) in mgr.events().iter().enumerate() {
                    prop_assert_eq!(usize::from(ev.sequence_number), i + 1);
                }
                prop_assert!(mgr.len() < mgr.capacity());
                let expected = gcd_of(
                    mgr.events()
                        .iter()
                        .filter(|e| e.enabled)
                        .filter_map(|e| e.repetition.period_ms()),
                );
                prop_assert_eq!(mgr.gcd_period_ms(), expected);
            }
        }
    }

    // ── tick period ───────────────────────────────────────────────────────────

    #[test]
    fn gcd_tracks_creates_and_deletes() {
        let mut mgr = EventManager::new();
        assert_eq!(mgr.gcd_period_ms(), 0);

        mgr.create_mask_event(at(0, 0, 0), 1, Repetition::every_millis(200))
            .unwrap();
        mgr.create_mask_event(at(0, 0, 0), 2, Repetition::every_millis(300))
            .unwrap();
        mgr.create_mask_event(at(0, 0, 0), 4, Repetition::every_millis(500))
            .unwrap();
        assert_eq!(mgr.gcd_period_ms(), 100);

        // Remove the 300 ms event → gcd(200, 500) = 100
        mgr.delete(2).unwrap();
        assert_eq!(mgr.gcd_period_ms(), 100);

        // Remove the 200 ms event → 500
        mgr.delete(1).unwrap();
        assert_eq!(mgr.gcd_period_ms(), 500);

        mgr.delete(1).unwrap();
        assert_eq!(mgr.gcd_period_ms(), 0);
    }

    #[test]
    fn calendar_events_do_not_affect_gcd() {
        let mut mgr = EventManager::new();
        mgr.create_mask_event(at(0, 0, 0), 1, Repetition::every_seconds(3))
            .unwrap();
        mgr.create_mask_event(at(0, 0, 0), 1, Repetition::Weekly)
            .unwrap();
        assert_eq!(mgr.gcd_period_ms(), 3_000);
        mgr.delete(2).unwrap();
        assert_eq!(mgr.gcd_period_ms(), 3_000);
    }

    #[test]
    fn disabling_removes_period_from_gcd() {
        let mut mgr = EventManager::new();
        mgr.create_mask_event(at(0, 0, 0), 1, Repetition::every_millis(400))
            .unwrap();
        mgr.create_mask_event(at(0, 0, 0), 1, Repetition::every_millis(600))
            .unwrap();
        assert_eq!(mgr.gcd_period_ms(), 200);

        mgr.set_enabled(2, false).unwrap();
        assert_eq!(mgr.gcd_period_ms(), 400);
        mgr.set_enabled(1, false).unwrap();
        assert_eq!(mgr.gcd_period_ms(), 0);
        mgr.set_enabled(2, true).unwrap();
        assert_eq!(mgr.gcd_period_ms(), 600);

        assert!(matches!(
            mgr.set_enabled(3, true),
            Err(EngineError::NotFound { .. })
        ));
    }

    // ── list ──────────────────────────────────────────────────────────────────

    #[test]
    fn list_yields_sequence_numbers_in_order() {
        let mut mgr = EventManager::new();
        mgr.create_single_channel_event(at(9, 0, 0), 0, ChannelState::Open, Repetition::Daily)
            .unwrap();
        mgr.create_single_channel_event(at(18, 0, 0), 0, ChannelState::Closed, Repetition::Daily)
            .unwrap();
        let listed: Vec<(u8, String)> = mgr.list().map(|(n, s)| (n, s.to_string())).collect();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0, 1);
        assert!(listed[0].1.contains("CH1 Open"));
        assert!(listed[1].1.starts_with("Event 2 : "));
    }
}

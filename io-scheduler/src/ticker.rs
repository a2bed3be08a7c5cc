//! Shared-tick driver for interval events.
//!
//! One timer serves every enabled interval event.  Its period is the GCD of
//! their periods (see [`crate::period`]), so each event's period is a whole
//! number of ticks and no boundary is skipped or counted twice.
//!
//! The run loop reports wall time through [`PeriodicTicker::advance_to`],
//! which credits exactly the time since the previous call.  The engine also
//! settles the ticker before every table change, so a period change never
//! hands stale time to new events.
//!
//! Interval events never expire; they run until deleted or disabled.

use tokio::time::Instant;
use tracing::debug;

use crate::event::Repetition;
use crate::executor::Executor;
use crate::hal::{OutputDriver, SerialTransport};
use crate::table::EventManager;

#[derive(Debug, Default)]
pub struct PeriodicTicker {
    /// Instant up to which elapsed time has been credited.  `None` while
    /// no run loop drives the ticker.
    anchor: Option<Instant>,
}

impl PeriodicTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start crediting time from `at`.
    pub fn start(&mut self, at: Instant) {
        self.anchor = Some(at);
    }

    pub fn stop(&mut self) {
        self.anchor = None;
    }

    pub fn anchor(&self) -> Option<Instant> {
        self.anchor
    }

    /// Credit the time between the anchor and `at`, then move the anchor to
    /// `at`.
    ///
    /// Called on every scheduled tick and before every table change, so a
    /// new event never receives time that passed before it existed.  An
    /// `at` earlier than the anchor credits nothing.  Does nothing while
    /// stopped.
    pub fn advance_to<O, S>(
        &mut self,
        at: Instant,
        manager: &mut EventManager,
        executor: &mut Executor<O, S>,
    ) -> usize
    where
        O: OutputDriver,
        S: SerialTransport,
    {
        let Some(anchor) = self.anchor else {
            return 0;
        };
        if at <= anchor {
            return 0;
        }
        self.anchor = Some(at);
        let elapsed_ms = u32::try_from((at - anchor).as_millis()).unwrap_or(u32::MAX);
        if elapsed_ms == 0 {
            return 0;
        }
        self.tick(elapsed_ms, manager, executor)
    }

    /// Advance every enabled interval event by `tick_ms` and fire the ones
    /// whose period has elapsed.
    ///
    /// Returns the number of events fired.
    pub fn tick<O, S>(
        &mut self,
        tick_ms: u32,
        manager: &mut EventManager,
        executor: &mut Executor<O, S>,
    ) -> usize
    where
        O: OutputDriver,
        S: SerialTransport,
    {
        let mut fired = 0;
        for event in manager.events_mut() {
            if !event.enabled {
                continue;
            }
            let Repetition::Every(interval) = &mut event.repetition else {
                continue;
            };
            interval.elapsed_ms = interval.elapsed_ms.saturating_add(tick_ms);
            if interval.elapsed_ms < interval.period_ms {
                continue;
            }
            interval.elapsed_ms = 0;
            debug!(
                sequence_number = event.sequence_number,
                tick_ms,
                "Event {} : triggered", event.sequence_number
            );
            executor.execute(event);
            fired += 1;
        }
        fired
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

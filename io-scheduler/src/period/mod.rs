//! Shared tick period for the periodic ticker.
//!
//! Every enabled interval event fires at a multiple of the ticker cadence
//! only if that cadence divides its period exactly.  The largest cadence
//! with that property is the GCD of all active periods, so one timer serves
//! the whole set without missed or doubled firings.
//!
//! The value is derived, never stored independently of the table: the event
//! manager recomputes it after every change that touches the periodic set.

pub mod math;

use tracing::debug;

use crate::event::TimingEvent;
use math::gcd_of;

/// Shared tick period and the periods it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickPeriodInfo {
    /// GCD of all active periods in milliseconds; `0` when there are none.
    pub period_ms: u32,

    /// Unique active periods (sorted, deduplicated).
    pub unique_periods: Vec<u32>,

    /// Number of enabled interval events that contributed.
    pub event_count: usize,
}

impl TickPeriodInfo {
    /// Derive the tick period from the current table contents.
    ///
    /// Only enabled interval events with a non-zero period take part.
    pub fn from_events(events: &[TimingEvent]) -> Self {
        let mut unique_periods: Vec<u32> = events
            .iter()
            .filter(|e| e.enabled)
            .filter_map(|e| e.repetition.period_ms())
            .filter(|&p| p > 0)
            .collect();
        let event_count = unique_periods.len();
        unique_periods.sort_unstable();
        unique_periods.dedup();

        let period_ms = gcd_of(unique_periods.iter().copied());

        for p in &unique_periods {
            debug!(period_ms = p, "  active period");
        }

        Self {
            period_ms,
            unique_periods,
            event_count,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.period_ms == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Wall-clock trigger evaluation.
//!
//! [`CalendarEvaluator::poll`] is called on a fixed cadence (100 ms by
//! default) and acts at most once per change of the clock's second field.
//! Each acting poll scans the table in ascending order and fires every
//! enabled calendar event whose trigger matches the clock reading.
//!
//! One-shot events are deleted after they fire.  Deletions wait until the
//! scan is over and run from the highest sequence number down, so neither
//! the scan nor the remaining deletions see a renumbered slot.

use tracing::{debug, info, warn};

use crate::datetime::DateTime;
use crate::event::Repetition;
use crate::executor::Executor;
use crate::hal::{OutputDriver, SerialTransport};
use crate::table::EventManager;

#[derive(Debug, Default)]
pub struct CalendarEvaluator {
    /// Second field of the last reading that was acted on.
    previous_second: Option<u8>,
}

impl CalendarEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the table against `now`.
    ///
    /// Returns the number of events fired; `0` when the second has not
    /// changed since the previous acting poll.
    pub fn poll<O, S>(
        &mut self,
        now: &DateTime,
        manager: &mut EventManager,
        executor: &mut Executor<O, S>,
    ) -> usize
    where
        O: OutputDriver,
        S: SerialTransport,
    {
        if self.previous_second == Some(now.second) {
            return 0;
        }
        self.previous_second = Some(now.second);

        let mut fired = 0;
        let mut expired = Vec::new();
        for event in manager.events() {
            if !event.matches_calendar(now) {
                continue;
            }
            info!("Event {} : triggered", event.sequence_number);
            executor.execute(event);
            fired += 1;
            if event.repetition == Repetition::Once {
                expired.push(event.sequence_number);
            }
        }

        for sequence_number in expired.into_iter().rev() {
            if let Err(e) = manager.delete(sequence_number) {
                warn!(sequence_number, error = %e, "One-shot event vanished before deletion");
            }
        }

        if fired > 0 {
            debug!(now = %now, fired, "Calendar scan complete");
        }
        fired
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

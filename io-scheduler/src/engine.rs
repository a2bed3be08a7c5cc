/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runtime that ties the table, the evaluators and the hardware together.
//!
//! # Concurrency model
//!
//! All mutable state (clock, [`EventManager`], [`Executor`], both
//! evaluators) lives behind one `tokio::sync::Mutex`.  Front-end calls, the
//! calendar loop and the ticker loop each take that lock for the duration
//! of one operation, so a scan never observes a half-applied create or
//! delete, and a firing's hardware calls finish before anyone else runs.
//!
//! ```text
//!   front-end ──create/delete/list──┐
//!   calendar loop (100 ms) ─────────┼──► Mutex<Core> ──► Executor ──► outputs / serial
//!   ticker loop (GCD period) ───────┘
//! ```
//!
//! The two loops run as independent tokio tasks with independent cadences.
//! Every table change publishes the shared tick period on a `watch` channel;
//! the ticker loop rebuilds its deadline schedule whenever that value
//! changes and waits on the channel alone while the period is `0`.
//! [`Engine::run`] returns once the shutdown channel reads `true`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::calendar::CalendarEvaluator;
use crate::datetime::DateTime;
use crate::event::{
    ActionPayload, ChannelState, Repetition, SerialFrame, TimingEvent, DOUT_CHANNELS,
};
use crate::executor::Executor;
use crate::hal::{Clock, IoError, OutputDriver, SerialTransport};
use crate::table::{EngineError, EventManager, MAX_EVENTS};
use crate::ticker::PeriodicTicker;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default calendar poll cadence.  Well under one second so every second
/// change is seen.
pub const DEFAULT_CALENDAR_POLL: Duration = Duration::from_millis(100);

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Event table slots, including the reserved one.
    pub capacity: usize,
    /// Calendar poll cadence.
    pub calendar_poll: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            capacity: MAX_EVENTS,
            calendar_poll: DEFAULT_CALENDAR_POLL,
        }
    }
}

/// Failure of [`Engine::set_time`].
#[derive(Debug, Error)]
pub enum SetTimeError {
    #[error(transparent)]
    Invalid(#[from] EngineError),

    #[error(transparent)]
    Clock(#[from] IoError),
}

// ── Core ──────────────────────────────────────────────────────────────────────

struct Core<C, O, S> {
    clock: C,
    manager: EventManager,
    executor: Executor<O, S>,
    calendar: CalendarEvaluator,
    ticker: PeriodicTicker,
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Handle to a running (or runnable) engine.  Cloning shares the same state.
pub struct Engine<C, O, S> {
    core: Arc<Mutex<Core<C, O, S>>>,
    /// Latest shared tick period, for the ticker loop.
    period_tx: Arc<watch::Sender<u32>>,
    calendar_poll: Duration,
}

impl<C, O, S> Clone for Engine<C, O, S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            period_tx: Arc::clone(&self.period_tx),
            calendar_poll: self.calendar_poll,
        }
    }
}

impl<C, O, S> Engine<C, O, S>
where
    C: Clock + Send + 'static,
    O: OutputDriver + Send + 'static,
    S: SerialTransport + Send + 'static,
{
    pub fn new(clock: C, outputs: O, serial: S) -> Self {
        Self::with_options(clock, outputs, serial, EngineOptions::default())
    }

    pub fn with_options(clock: C, outputs: O, serial: S, options: EngineOptions) -> Self {
        let core = Core {
            clock,
            manager: EventManager::with_capacity(options.capacity),
            executor: Executor::new(outputs, serial),
            calendar: CalendarEvaluator::new(),
            ticker: PeriodicTicker::new(),
        };
        let (period_tx, _) = watch::channel(0);
        Self {
            core: Arc::new(Mutex::new(core)),
            period_tx: Arc::new(period_tx),
            calendar_poll: options.calendar_poll,
        }
    }

    // ── Event table ───────────────────────────────────────────────────────────

    pub async fn create_dout_event(
        &self,
        time: DateTime,
        channels: [ChannelState; DOUT_CHANNELS],
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        self.mutate(|m| m.create_dout_event(time, channels, repetition))
            .await
    }

    pub async fn create_single_channel_event(
        &self,
        time: DateTime,
        channel: usize,
        state: ChannelState,
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        self.mutate(|m| m.create_single_channel_event(time, channel, state, repetition))
            .await
    }

    pub async fn create_mask_event(
        &self,
        time: DateTime,
        mask: u8,
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        self.mutate(|m| m.create_mask_event(time, mask, repetition))
            .await
    }

    pub async fn create_serial_event(
        &self,
        time: DateTime,
        frame: SerialFrame,
        repetition: Repetition,
    ) -> Result<u8, EngineError> {
        self.mutate(|m| m.create_serial_event(time, frame, repetition))
            .await
    }

    /// Add an event with a prepared action, e.g. a configuration seed.
    pub async fn insert(
        &self,
        time: DateTime,
        repetition: Repetition,
        action: ActionPayload,
    ) -> Result<u8, EngineError> {
        self.mutate(|m| m.insert(time, repetition, action)).await
    }

    pub async fn delete(&self, sequence_number: u8) -> Result<(), EngineError> {
        self.mutate(|m| m.delete(sequence_number)).await
    }

    pub async fn set_enabled(&self, sequence_number: u8, enabled: bool) -> Result<(), EngineError> {
        self.mutate(|m| m.set_enabled(sequence_number, enabled))
            .await
    }

    /// Apply one table change under the lock.
    ///
    /// Interval accumulators are first credited with the time elapsed up to
    /// now, so the change (and any new period) only affects time after it.
    async fn mutate<T>(&self, change: impl FnOnce(&mut EventManager) -> T) -> T {
        let mut guard = self.core.lock().await;
        let core = &mut *guard;
        core.ticker
            .advance_to(Instant::now(), &mut core.manager, &mut core.executor);
        let out = change(&mut core.manager);
        self.publish_period(core.manager.gcd_period_ms());
        out
    }

    fn publish_period(&self, period_ms: u32) {
        self.period_tx.send_if_modified(|current| {
            if *current == period_ms {
                return false;
            }
            *current = period_ms;
            true
        });
    }

    /// Rendered summaries, in sequence order.
    pub async fn list(&self) -> Vec<(u8, String)> {
        let core = self.core.lock().await;
        core.manager
            .list()
            .map(|(n, summary)| (n, summary.to_string()))
            .collect()
    }

    pub async fn get(&self, sequence_number: u8) -> Option<TimingEvent> {
        self.core.lock().await.manager.get(sequence_number).cloned()
    }

    pub async fn len(&self) -> usize {
        self.core.lock().await.manager.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.core.lock().await.manager.is_empty()
    }

    pub async fn gcd_period_ms(&self) -> u32 {
        self.core.lock().await.manager.gcd_period_ms()
    }

    // ── Clock ─────────────────────────────────────────────────────────────────

    pub async fn now(&self) -> DateTime {
        self.core.lock().await.clock.now()
    }

    /// Validate `time` and program the clock with it.
    pub async fn set_time(&self, time: DateTime) -> Result<(), SetTimeError> {
        time.validate().map_err(EngineError::from)?;
        self.core.lock().await.clock.set(time)?;
        info!(now = %time, "Clock set");
        Ok(())
    }

    // ── Single steps ──────────────────────────────────────────────────────────

    /// One calendar poll against the current clock reading.
    pub async fn poll_calendar(&self) -> usize {
        let mut guard = self.core.lock().await;
        let core = &mut *guard;
        let now = core.clock.now();
        let fired = core
            .calendar
            .poll(&now, &mut core.manager, &mut core.executor);
        self.publish_period(core.manager.gcd_period_ms());
        fired
    }

    /// One ticker step of `tick_ms` milliseconds, for driving the interval
    /// events without [`Engine::run`].
    pub async fn tick(&self, tick_ms: u32) -> usize {
        let mut guard = self.core.lock().await;
        let core = &mut *guard;
        core.ticker
            .tick(tick_ms, &mut core.manager, &mut core.executor)
    }

    // ── Run loops ─────────────────────────────────────────────────────────────

    /// Run both evaluators until `shutdown` reads `true` (or its sender is
    /// dropped).
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!(
            calendar_poll_ms = self.calendar_poll.as_millis() as u64,
            "Engine started"
        );

        let calendar = tokio::spawn(self.clone().calendar_loop(shutdown.clone()));
        let ticker = tokio::spawn(self.clone().ticker_loop(shutdown));

        for (name, handle) in [("calendar", calendar), ("ticker", ticker)] {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "Engine task ended abnormally");
            }
        }
        info!("Engine stopped");
    }

    async fn calendar_loop(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.calendar_poll);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll_calendar().await;
                }
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }
        debug!("Calendar loop exited");
    }

    async fn ticker_loop(self, mut shutdown: watch::Receiver<bool>) {
        let mut period_rx = self.period_tx.subscribe();
        self.core.lock().await.ticker.start(Instant::now());

        'adopt: loop {
            let gcd = *period_rx.borrow_and_update();
            if gcd == 0 {
                // Nothing accumulates while idle; wait for a period.
                tokio::select! {
                    res = period_rx.changed() => match res {
                        Ok(()) => continue 'adopt,
                        Err(_) => break 'adopt,
                    },
                    _ = wait_for_shutdown(&mut shutdown) => break 'adopt,
                }
            }

            // Deadlines count from the last credited instant, so a restart
            // neither loses nor repeats time.
            let anchor = self
                .core
                .lock()
                .await
                .ticker
                .anchor()
                .unwrap_or_else(Instant::now);
            let period = Duration::from_millis(u64::from(gcd));
            let mut interval = tokio::time::interval_at(anchor + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            debug!(period_ms = gcd, "Ticker adopted shared period");

            loop {
                tokio::select! {
                    deadline = interval.tick() => {
                        let mut guard = self.core.lock().await;
                        let core = &mut *guard;
                        core.ticker
                            .advance_to(deadline, &mut core.manager, &mut core.executor);
                    }
                    res = period_rx.changed() => match res {
                        Ok(()) => continue 'adopt,
                        Err(_) => break 'adopt,
                    },
                    _ = wait_for_shutdown(&mut shutdown) => break 'adopt,
                }
            }
        }

        self.core.lock().await.ticker.stop();
        debug!("Ticker loop exited");
    }
}

/// Resolve once the flag is `true` or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

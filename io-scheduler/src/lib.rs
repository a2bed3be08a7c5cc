/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! io-scheduler – scheduled digital-output and serial automation engine
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── datetime      – RTC date/time value and field validation
//! ├── event         – timing events, repetition kinds, action payloads
//! ├── period/       – GCD helpers and the shared tick period
//! ├── table/        – event table, EventManager, EngineError
//! ├── hal/          – Clock / OutputDriver / SerialTransport + console impls
//! ├── executor      – fired event → hardware calls
//! ├── calendar      – wall-clock trigger evaluation (100 ms poll)
//! ├── ticker        – shared-tick interval evaluation
//! ├── engine        – shared lock, run loops, front-end API
//! └── config        – YAML engine options and seed events
//! ```

pub mod calendar;
pub mod config;
pub mod datetime;
pub mod engine;
pub mod event;
pub mod executor;
pub mod hal;
pub mod period;
pub mod table;
pub mod ticker;

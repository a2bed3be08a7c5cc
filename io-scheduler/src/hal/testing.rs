//! Recording fakes for unit tests.
//!
//! Each fake pushes the calls it receives into a shared log so a test can
//! keep a handle after the fake has moved into an executor or engine.

use std::sync::{Arc, Mutex};

use super::{Clock, IoError, OutputDriver, SerialTransport};
use crate::datetime::DateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Apply { channel: u8, state: bool },
    ApplyAll { mask: u8 },
    Rs485(Vec<u8>),
    Can { id: u32, extended: bool, payload: Vec<u8> },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

/// Output bank that records calls and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct FakeOutputs {
    pub log: CallLog,
    pub fail: Arc<Mutex<bool>>,
}

impl OutputDriver for FakeOutputs {
    fn apply(&mut self, channel: u8, state: bool) -> Result<(), IoError> {
        self.log.lock().unwrap().push(Call::Apply { channel, state });
        if *self.fail.lock().unwrap() {
            return Err(IoError::Output {
                channel: Some(channel),
            });
        }
        Ok(())
    }

    fn apply_all(&mut self, mask: u8) -> Result<(), IoError> {
        self.log.lock().unwrap().push(Call::ApplyAll { mask });
        if *self.fail.lock().unwrap() {
            return Err(IoError::Output { channel: None });
        }
        Ok(())
    }
}

/// Transceivers that record calls and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct FakeSerial {
    pub log: CallLog,
    pub fail: Arc<Mutex<bool>>,
}

impl FakeSerial {
    fn result(&self, bus: &'static str) -> Result<(), IoError> {
        if *self.fail.lock().unwrap() {
            return Err(IoError::Transport {
                bus,
                reason: "injected".into(),
            });
        }
        Ok(())
    }
}

impl SerialTransport for FakeSerial {
    fn send_rs485(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        self.log.lock().unwrap().push(Call::Rs485(bytes.to_vec()));
        self.result("RS485")
    }

    fn send_can(&mut self, id: u32, extended: bool, payload: &[u8]) -> Result<(), IoError> {
        self.log.lock().unwrap().push(Call::Can {
            id,
            extended,
            payload: payload.to_vec(),
        });
        self.result("CAN")
    }
}

/// Clock whose reading is set by the test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    pub now: Arc<Mutex<DateTime>>,
}

impl ManualClock {
    pub fn at(now: DateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime {
        *self.now.lock().unwrap()
    }

    fn set(&mut self, time: DateTime) -> Result<(), IoError> {
        *self.now.lock().unwrap() = time;
        Ok(())
    }
}

//! Test doubles for unit tests in this crate.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeZone, Utc};
use tether_proto::CloseCode;

use crate::{env::Environment, error::TransmitError, transport::FrameSink};

/// Manually advanced clock with a counter-based RNG.
#[derive(Clone)]
pub(crate) struct ManualEnv {
    state: Arc<Mutex<ManualState>>,
}

struct ManualState {
    base: Instant,
    offset: Duration,
    counter: u8,
}

impl ManualEnv {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                base: Instant::now(),
                offset: Duration::ZERO,
                counter: 0,
            })),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.state.lock().unwrap().offset += by;
    }
}

impl Environment for ManualEnv {
    fn now(&self) -> Instant {
        let state = self.state.lock().unwrap();
        state.base + state.offset
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let offset = self.state.lock().unwrap().offset;
        let epoch = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        epoch + chrono::Duration::from_std(offset).unwrap()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let mut state = self.state.lock().unwrap();
        for byte in buffer {
            state.counter = state.counter.wrapping_add(1);
            *byte = state.counter;
        }
    }
}

/// Sink that records frames and can be told to start failing.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
}

#[derive(Default)]
struct SinkLog {
    frames: Vec<String>,
    closes: Vec<(CloseCode, String)>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Accept `n` more frames, then fail every transmit.
    pub(crate) fn fail_after(&self, n: usize) {
        let mut log = self.log.lock().unwrap();
        log.fail_after = Some(log.frames.len() + n);
    }

    pub(crate) fn frames(&self) -> Vec<serde_json::Value> {
        let log = self.log.lock().unwrap();
        log.frames.iter().map(|f| serde_json::from_str(f).unwrap()).collect()
    }

    /// `message` field of every transmitted chat frame.
    pub(crate) fn messages(&self) -> Vec<String> {
        self.frames()
            .iter()
            .filter(|f| f["type"] == "message")
            .map(|f| f["message"].as_str().unwrap().to_string())
            .collect()
    }

    pub(crate) fn kinds(&self) -> Vec<String> {
        self.frames().iter().map(|f| f["type"].as_str().unwrap().to_string()).collect()
    }

    pub(crate) fn closes(&self) -> Vec<(CloseCode, String)> {
        self.log.lock().unwrap().closes.clone()
    }
}

impl FrameSink for RecordingSink {
    fn transmit(&mut self, frame: String) -> Result<(), TransmitError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_after.is_some_and(|limit| log.frames.len() >= limit) {
            return Err(TransmitError::Closed);
        }
        log.frames.push(frame);
        Ok(())
    }

    fn close(&mut self, code: CloseCode, reason: &str) {
        self.log.lock().unwrap().closes.push((code, reason.to_string()));
    }
}

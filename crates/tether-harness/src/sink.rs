//! In-memory frame sink for driving a connection without sockets.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tether_core::{FrameSink, TransmitError};
use tether_proto::CloseCode;

/// Sink that records every frame and close request.
///
/// Clones share one log, so a test can keep a clone while the connection
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct CapturingSink {
    log: Arc<Mutex<SinkLog>>,
}

#[derive(Debug, Default)]
struct SinkLog {
    frames: Vec<String>,
    closes: Vec<(CloseCode, String)>,
}

impl CapturingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transmitted frames, parsed. Unparseable frames are skipped.
    pub fn frames(&self) -> Vec<Value> {
        self.lock().frames.iter().filter_map(|f| serde_json::from_str(f).ok()).collect()
    }

    /// `message` of every transmitted chat frame.
    pub fn messages(&self) -> Vec<String> {
        self.frames()
            .iter()
            .filter(|f| f["type"] == "message")
            .filter_map(|f| f["message"].as_str().map(str::to_string))
            .collect()
    }

    /// Close requests, in order.
    pub fn closes(&self) -> Vec<(CloseCode, String)> {
        self.lock().closes.clone()
    }
}

impl FrameSink for CapturingSink {
    fn transmit(&mut self, frame: String) -> Result<(), TransmitError> {
        self.lock().frames.push(frame);
        Ok(())
    }

    fn close(&mut self, code: CloseCode, reason: &str) {
        self.lock().closes.push((code, reason.to_string()));
    }
}

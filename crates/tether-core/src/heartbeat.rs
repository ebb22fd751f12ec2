//! Liveness ping deadlines.
//!
//! While the socket is open a ping is due every `interval`. Sending a ping
//! arms an acknowledgment deadline `timeout` later unless an earlier ping is
//! still unanswered; an acknowledgment clears it. If the deadline passes
//! first the connection is considered half-open.
//!
//! Deadlines are plain instants polled by the connection, so "cancelling a
//! timer" is clearing an `Option`. [`Heartbeat::stop`] clears both.

use std::time::{Duration, Instant};

/// Outcome of polling the heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatPoll {
    /// Nothing due.
    Idle,
    /// A ping is due now; the acknowledgment deadline is armed if it was
    /// not already.
    Ping,
    /// The acknowledgment deadline passed. The heartbeat has stopped.
    Expired,
}

/// Heartbeat deadlines for one open socket.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    timeout: Duration,
    next_ping: Option<Instant>,
    ack_deadline: Option<Instant>,
}

impl Heartbeat {
    /// Create a stopped heartbeat.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout, next_ping: None, ack_deadline: None }
    }

    /// Start pinging; the first ping is due one interval from `now`.
    pub fn start(&mut self, now: Instant) {
        self.ack_deadline = None;
        self.next_ping = Some(now + self.interval);
    }

    /// Cancel all deadlines.
    pub fn stop(&mut self) {
        self.next_ping = None;
        self.ack_deadline = None;
    }

    /// Whether the heartbeat is running.
    pub fn is_running(&self) -> bool {
        self.next_ping.is_some()
    }

    /// Whether a ping is awaiting acknowledgment.
    pub fn awaiting_ack(&self) -> bool {
        self.ack_deadline.is_some()
    }

    /// Record an acknowledgment. Returns whether one was outstanding.
    pub fn acknowledge(&mut self) -> bool {
        self.ack_deadline.take().is_some()
    }

    /// Check deadlines at `now`.
    pub fn poll(&mut self, now: Instant) -> HeartbeatPoll {
        if self.ack_deadline.is_some_and(|deadline| now >= deadline) {
            self.stop();
            return HeartbeatPoll::Expired;
        }

        match self.next_ping {
            Some(due) if now >= due => {
                // An unanswered ping keeps its deadline, so a timeout longer
                // than the interval still expires.
                if self.ack_deadline.is_none() {
                    self.ack_deadline = Some(now + self.timeout);
                }
                self.next_ping = Some(now + self.interval);
                HeartbeatPoll::Ping
            },
            _ => HeartbeatPoll::Idle,
        }
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_ping, self.ack_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Change timings. Running deadlines are kept until they fire.
    pub fn set_timings(&mut self, interval: Duration, timeout: Duration) {
        self.interval = interval;
        self.timeout = timeout;
    }
}

//! Reference model of the connection state machine.
//!
//! A deliberately naive re-statement of the lifecycle rules (states, attempt
//! counting, backoff deadlines, queueing and flush order) used as the oracle
//! in model-based tests. Heartbeats are out of scope: model tests configure
//! an interval longer than any generated run.

use std::{collections::VecDeque, time::Duration};

use tether_core::{ConnectionState, ReconnectPolicy};

/// One step applied to both the model and the real connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `connect()`.
    Connect,
    /// `disconnect()`.
    Disconnect,
    /// Send chat message number `n`.
    Send(u32),
    /// The in-flight dial succeeds.
    Open,
    /// The in-flight dial fails.
    DialFailed,
    /// The socket closes, cleanly or not.
    RemoteClose {
        /// Close code 1000 rather than 1006.
        intentional: bool,
    },
    /// Advance the clock, then fire due deadlines.
    Advance(Duration),
}

/// Observable state of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConnection {
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Reconnect attempts since the last open.
    pub attempts: u32,
    /// Whether unintentional closes reconnect.
    pub reconnect_enabled: bool,
    /// Next reconnect, as time since start.
    pub reconnect_at: Option<Duration>,
    /// Messages waiting to be sent, oldest first.
    pub queue: VecDeque<String>,
    /// Messages transmitted, in order.
    pub wire: Vec<String>,
    /// Dials started.
    pub dials: u32,
    /// Exhaustion reports emitted.
    pub exhaustions: u32,
    exhaustion_reported: bool,
    pending_connect: bool,
    dial_deadline: Option<Duration>,
    now: Duration,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    capacity: usize,
}

impl ModelConnection {
    /// Disconnected model with the given limits.
    pub fn new(policy: ReconnectPolicy, connect_timeout: Duration, capacity: usize) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            reconnect_enabled: true,
            reconnect_at: None,
            queue: VecDeque::new(),
            wire: Vec::new(),
            dials: 0,
            exhaustions: 0,
            exhaustion_reported: false,
            pending_connect: false,
            dial_deadline: None,
            now: Duration::ZERO,
            policy,
            connect_timeout,
            capacity,
        }
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Connect => match self.state {
                ConnectionState::Disconnected => {
                    self.reconnect_enabled = true;
                    self.exhaustion_reported = false;
                    self.begin_dial();
                },
                ConnectionState::Closing => {
                    self.reconnect_enabled = true;
                    self.exhaustion_reported = false;
                    self.pending_connect = true;
                },
                ConnectionState::Connecting | ConnectionState::Open => {},
            },
            Operation::Disconnect => {
                self.reconnect_enabled = false;
                self.pending_connect = false;
                self.attempts = self.policy.max_attempts;
                self.reconnect_at = None;
                self.dial_deadline = None;
                match self.state {
                    ConnectionState::Open => self.state = ConnectionState::Closing,
                    ConnectionState::Connecting => self.state = ConnectionState::Disconnected,
                    ConnectionState::Closing | ConnectionState::Disconnected => {},
                }
            },
            Operation::Send(n) => {
                let message = format!("m{n}");
                if self.state == ConnectionState::Open {
                    self.wire.push(message);
                } else {
                    self.queue.push_back(message);
                    if self.queue.len() > self.capacity {
                        self.queue.pop_front();
                    }
                }
            },
            Operation::Open => {
                if self.state == ConnectionState::Connecting {
                    self.state = ConnectionState::Open;
                    self.attempts = 0;
                    self.exhaustion_reported = false;
                    self.dial_deadline = None;
                    self.wire.extend(self.queue.drain(..));
                }
            },
            Operation::DialFailed => {
                if self.state == ConnectionState::Connecting {
                    self.fail_dial();
                }
            },
            Operation::RemoteClose { intentional } => {
                if self.state != ConnectionState::Disconnected {
                    let was_closing = self.state == ConnectionState::Closing;
                    self.state = ConnectionState::Disconnected;
                    self.dial_deadline = None;
                    if was_closing && self.pending_connect {
                        self.pending_connect = false;
                        self.begin_dial();
                    } else if !was_closing && !intentional && self.reconnect_enabled {
                        self.schedule_reconnect();
                    }
                }
            },
            Operation::Advance(by) => {
                self.now += *by;
                self.tick();
            },
        }
    }

    fn tick(&mut self) {
        match self.state {
            ConnectionState::Disconnected => {
                if self.reconnect_at.is_some_and(|at| self.now >= at) {
                    self.begin_dial();
                }
            },
            ConnectionState::Connecting => {
                if self.dial_deadline.is_some_and(|at| self.now >= at) {
                    self.fail_dial();
                }
            },
            ConnectionState::Open | ConnectionState::Closing => {},
        }
    }

    fn begin_dial(&mut self) {
        self.state = ConnectionState::Connecting;
        self.reconnect_at = None;
        self.dial_deadline = Some(self.now + self.connect_timeout);
        self.dials += 1;
    }

    fn fail_dial(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.dial_deadline = None;
        if self.reconnect_enabled {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&mut self) {
        let next = self.attempts + 1;
        if next > self.policy.max_attempts {
            if !self.exhaustion_reported {
                self.exhaustion_reported = true;
                self.exhaustions += 1;
            }
            return;
        }
        self.attempts = next;
        let delay = self.policy.base_delay * self.policy.multiplier.pow(next - 1);
        self.reconnect_at = Some(self.now + delay);
    }
}

//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! connection behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!    ModelConnection   RealWorld       Compare
//!      (reference)   (Connection)     Results
//! ```

use std::time::{Duration, Instant};

use proptest::prelude::*;
use tether_core::{
    Channel, ChannelEvent, Connection, ConnectionAction, ConnectionConfig, Environment,
    ReconnectPolicy,
};
use tether_harness::{CapturingSink, ModelConnection, Operation, SimEnv};
use tether_proto::{CloseCode, OutboundPayload};

const CAPACITY: usize = 4;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

fn policy() -> ReconnectPolicy {
    ReconnectPolicy { base_delay: Duration::from_millis(1000), multiplier: 2, max_attempts: 3 }
}

/// Real connection wrapper that mirrors the model's interface.
struct RealWorld {
    env: SimEnv,
    origin: Instant,
    sink: CapturingSink,
    connection: Connection<SimEnv, CapturingSink>,
    dials: u32,
    exhaustions: u32,
}

impl RealWorld {
    fn new(seed: u64) -> Self {
        let env = SimEnv::manual(seed);
        let config = ConnectionConfig {
            heartbeat_interval: Duration::from_secs(24 * 3600),
            heartbeat_timeout: Duration::from_secs(10),
            connect_timeout: CONNECT_TIMEOUT,
            reconnect: policy(),
            queue_capacity: CAPACITY,
        };
        let connection = Connection::new(env.clone(), Channel::chat("ws://server"), config);
        Self { origin: env.now(), env, sink: CapturingSink::new(), connection, dials: 0, exhaustions: 0 }
    }

    fn apply(&mut self, op: &Operation) {
        let epoch = self.connection.epoch();
        let actions = match op {
            Operation::Connect => self.connection.connect(),
            Operation::Disconnect => self.connection.disconnect(),
            Operation::Send(n) => {
                self.connection.send(OutboundPayload::message(format!("m{n}"), None, vec![]));
                Vec::new()
            },
            Operation::Open => self.connection.handle_open(epoch, self.sink.clone()),
            Operation::DialFailed => self.connection.handle_dial_failed(epoch, "refused"),
            Operation::RemoteClose { intentional } => {
                let code = if *intentional { CloseCode::NORMAL } else { CloseCode::ABNORMAL };
                self.connection.handle_closed(epoch, code, "")
            },
            Operation::Advance(by) => {
                self.env.advance(*by);
                self.connection.tick()
            },
        };

        for action in actions {
            match action {
                ConnectionAction::Dial { .. } => self.dials += 1,
                ConnectionAction::Emit(ChannelEvent::ReconnectExhausted { .. }) => {
                    self.exhaustions += 1;
                },
                _ => {},
            }
        }
    }

    fn queued(&self) -> Vec<String> {
        self.connection
            .queue()
            .iter()
            .filter_map(|item| match &item.envelope.payload {
                OutboundPayload::Message { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn assert_matches(&self, model: &ModelConnection) -> Result<(), TestCaseError> {
        prop_assert_eq!(self.connection.state(), model.state);
        prop_assert_eq!(self.connection.attempts(), model.attempts);
        prop_assert_eq!(self.connection.reconnect_enabled(), model.reconnect_enabled);
        prop_assert_eq!(
            self.connection.reconnect_at().map(|at| at - self.origin),
            model.reconnect_at
        );
        prop_assert_eq!(self.queued(), Vec::from(model.queue.clone()));
        prop_assert_eq!(self.sink.messages(), model.wire.clone());
        prop_assert_eq!(self.dials, model.dials);
        prop_assert_eq!(self.exhaustions, model.exhaustions);
        Ok(())
    }
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        2 => Just(Operation::Connect),
        1 => Just(Operation::Disconnect),
        4 => (0u32..1000).prop_map(Operation::Send),
        3 => Just(Operation::Open),
        3 => Just(Operation::DialFailed),
        2 => any::<bool>().prop_map(|intentional| Operation::RemoteClose { intentional }),
        3 => (0u64..40_000).prop_map(|ms| Operation::Advance(Duration::from_millis(ms))),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn connection_matches_model(seed in any::<u64>(), ops in prop::collection::vec(operation(), 1..60)) {
        let mut real = RealWorld::new(seed);
        let mut model = ModelConnection::new(policy(), CONNECT_TIMEOUT, CAPACITY);

        for op in &ops {
            real.apply(op);
            model.apply(op);
            real.assert_matches(&model)?;
        }
    }

    #[test]
    fn exhaustion_reported_once_per_connect(failures in 4usize..12) {
        let mut real = RealWorld::new(1);
        real.apply(&Operation::Connect);

        for _ in 0..failures {
            real.apply(&Operation::DialFailed);
            if let Some(at) = real.connection.reconnect_at() {
                let wait = at - real.env.now();
                real.apply(&Operation::Advance(wait));
            }
        }
        prop_assert_eq!(real.exhaustions, 1);
        prop_assert_eq!(real.dials, 1 + policy().max_attempts);

        real.apply(&Operation::Connect);
        real.apply(&Operation::DialFailed);
        prop_assert_eq!(real.exhaustions, 2);
    }
}

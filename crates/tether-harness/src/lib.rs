//! Deterministic simulation harness for Tether.
//!
//! Turmoil-based implementations of the [`tether_core::Environment`] and
//! [`tether_client::Dialer`] traits plus a scripted chat backend, for
//! reproducible tests of the full runtime (driver, socket task, WebSocket
//! framing) under network faults. A reference model of the connection backs
//! the model-based property tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_backend;
pub mod sim_dialer;
pub mod sim_env;
pub mod sink;

pub use model::{ModelConnection, Operation};
pub use sim_backend::{BackendBehavior, BackendLog, SimBackend};
pub use sim_dialer::SimDialer;
pub use sim_env::SimEnv;
pub use sink::CapturingSink;

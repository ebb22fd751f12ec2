//! Tether runtime
//!
//! Runs the sans-IO [`tether_core::Connection`] on tokio against real
//! WebSockets, and provides the HTTP fallback API.
//!
//! # Architecture
//!
//! Each channel gets one [`ChannelDriver`] task. The task owns the
//! connection, a socket task per dial ([`dialer::Dialer`] +
//! tokio-tungstenite), and the timer for the connection's next deadline.
//! Callers talk to it through a cloneable [`ChannelHandle`] whose methods
//! never block; events come back through the shared
//! [`tether_core::EventBus`].
//!
//! ```text
//! ChannelHandle ──commands──> ChannelDriver ──Dial──> socket task ──> server
//!                                   │   ^                 │
//!                                   │   └── epoch events ─┘
//!                                   └──Emit──> EventBus ──> listeners
//! ```

pub mod dialer;
pub mod driver;
pub mod env;
pub mod error;
pub mod handle;
pub mod http;
pub mod sink;
mod socket;

pub use dialer::{Dialer, TcpDialer};
pub use driver::{ChannelDriver, ChannelStatus};
pub use env::TokioEnv;
pub use error::{DialError, DriverStopped, HttpError};
pub use handle::ChannelHandle;
pub use http::{
    Acknowledgement, ChatReply, ChatRequest, ContextUpdateRequest, Feedback, Health,
    HistoryExchange, HistoryPage, HttpFallback, LabelCount, SessionStats,
};
pub use sink::WsSink;

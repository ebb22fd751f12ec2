//! Wire format for the Tether chat transport.
//!
//! Every frame is a single JSON object sent as a WebSocket text message. The
//! object always carries a `type` tag; everything else is kind-specific.
//!
//! Outbound frames are built from a typed [`OutboundPayload`] wrapped in an
//! [`Envelope`] that adds the delivery metadata (`id`, `timestamp`). Inbound
//! frames are kept loosely typed as [`InboundFrame`]: the server adds fields
//! over time (model metadata, context annotations) and the client only needs
//! a handful of them, so unknown fields pass through untouched.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod close;
pub mod endpoints;
pub mod errors;
pub mod inbound;
pub mod outbound;

pub use close::CloseCode;
pub use errors::{ProtocolError, Result};
pub use inbound::InboundFrame;
pub use outbound::{Envelope, HistoryTurn, OutboundPayload, Role};

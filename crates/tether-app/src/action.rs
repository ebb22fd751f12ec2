//! Application actions
//!
//! Produced by [`crate::App::handle`] for the runtime to execute.

use tether_proto::OutboundPayload;

use crate::event::AdminRequest;

/// Side effects requested by the application state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Redraw.
    Render,

    /// Exit.
    Quit,

    /// Open the chat channel (and the admin channel, if enabled).
    Connect,

    /// Close every channel.
    Disconnect,

    /// Send a payload on the chat channel.
    Send(OutboundPayload),

    /// Send a request on the admin channel.
    Admin(AdminRequest),

    /// Fetch stored history over HTTP.
    FetchHistory {
        /// Session to fetch.
        session_id: String,
        /// Most exchanges to return.
        limit: u32,
    },
}

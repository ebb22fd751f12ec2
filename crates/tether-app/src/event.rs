//! Application events
//!
//! Everything that can change the application state: user input, results of
//! background work, channel events and the clock.

use tether_client::HistoryExchange;
use tether_core::ChannelEvent;

use crate::settings::{ResponseLength, Theme};

/// An admin-channel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRequest {
    /// Server statistics.
    Stats,
    /// Open connections.
    Connections,
    /// Message to every connected client.
    Broadcast(String),
}

/// Which channel an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    /// The chat channel. Drives the link status and the transcript.
    Chat,
    /// The admin channel. Only ever produces notifications.
    Admin,
}

/// Events fed into [`crate::App::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// User submitted a chat message.
    Submit(String),

    /// User asked to connect.
    Connect,

    /// User asked to disconnect.
    Disconnect,

    /// Start a fresh session.
    NewSession,

    /// Load stored history for the current session.
    LoadHistory,

    /// Stored history arrived.
    HistoryLoaded {
        /// Session the history belongs to.
        session_id: String,
        /// Exchanges, newest first.
        exchanges: Vec<HistoryExchange>,
    },

    /// Fetching history failed.
    HistoryFailed(String),

    /// Change the colour scheme.
    SetTheme(Theme),

    /// Change the assistant personality.
    SetPersonality(String),

    /// Change the preferred answer length.
    SetResponseLength(ResponseLength),

    /// Change the font size.
    SetFontSize(u8),

    /// User started or stopped typing.
    Typing(bool),

    /// Admin-channel request.
    Admin(AdminRequest),

    /// Remove a saved conversation.
    DeleteConversation(String),

    /// Event from a channel's bus.
    Channel {
        /// Channel that emitted the event.
        role: ChannelRole,
        /// The event.
        event: ChannelEvent,
    },

    /// Periodic tick, expires notifications.
    Tick,

    /// Quit.
    Quit,
}

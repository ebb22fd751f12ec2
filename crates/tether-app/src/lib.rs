//! Application layer for Tether
//!
//! Pure state for chat front ends plus the bridge that wires it to live
//! channels. All state transitions go through [`App::handle`], so the same
//! logic runs under the terminal client and in tests.
//!
//! # Components
//!
//! - [`Conversation`]: messages, typing state, link status, notifications
//! - [`App`]: conversation plus persisted settings and summaries
//! - [`Bridge`]: executes [`AppAction`]s against channel handles
//! - [`Storage`]: key-value persistence ([`MemoryStorage`], [`FileStorage`])

pub mod action;
pub mod app;
pub mod bridge;
pub mod conversation;
pub mod error;
pub mod event;
pub mod message;
pub mod notification;
pub mod settings;
pub mod storage;
pub mod summaries;

#[cfg(test)]
mod testing;

pub use action::AppAction;
pub use app::App;
pub use bridge::Bridge;
pub use conversation::{Conversation, HISTORY_EXCHANGES, LinkStatus};
pub use error::{MAX_MESSAGE_CHARS, StorageError, ValidationError};
pub use event::{AdminRequest, AppEvent, ChannelRole};
pub use message::Message;
pub use notification::{Level, Notification, Notifications};
pub use settings::{ResponseLength, Settings, Theme};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use summaries::{ConversationList, ConversationSummary};

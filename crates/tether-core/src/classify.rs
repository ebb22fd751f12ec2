//! Inbound frame classification.
//!
//! Each channel carries a [`Classifier`] that maps the wire `type` tag to an
//! [`EventKind`]. The chat and admin channels share one connection state
//! machine and differ only in this strategy.

use std::fmt;

use crate::event::EventKind;

/// Maps a wire `type` tag to the event kind it is delivered under.
///
/// Unrecognised tags must map to [`EventKind::Unknown`], never be dropped.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Classify a frame by its `type` tag.
    fn classify(&self, kind: &str) -> EventKind;
}

/// Classifier for the chat channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatClassifier;

impl Classifier for ChatClassifier {
    fn classify(&self, kind: &str) -> EventKind {
        match kind {
            "response" => EventKind::Message,
            "error" => EventKind::Error,
            "typing" => EventKind::Typing,
            "context_updated" => EventKind::ContextUpdated,
            "admin_broadcast" => EventKind::AdminBroadcast,
            "pong" => EventKind::Pong,
            _ => EventKind::Unknown,
        }
    }
}

/// Classifier for the admin channel: chat kinds plus admin replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminClassifier;

impl Classifier for AdminClassifier {
    fn classify(&self, kind: &str) -> EventKind {
        match kind {
            "admin_stats" => EventKind::AdminStats,
            "connection_stats" => EventKind::ConnectionStats,
            "broadcast_sent" => EventKind::BroadcastSent,
            other => ChatClassifier.classify(other),
        }
    }
}

//! Named channel endpoints.

use std::sync::Arc;

use tether_proto::endpoints::{ADMIN_CHANNEL, CHAT_CHANNEL};

use crate::classify::{AdminClassifier, ChatClassifier, Classifier};

/// A named logical endpoint plus the strategy used to classify its frames.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Short name used in logs (`chat`, `admin`).
    pub name: String,
    /// Full WebSocket URL.
    pub endpoint: String,
    /// Frame classification strategy.
    pub classifier: Arc<dyn Classifier>,
}

impl Channel {
    /// Create a channel with an explicit classifier.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self { name: name.into(), endpoint: endpoint.into(), classifier }
    }

    /// The chat channel of the server at `base_url` (e.g. `ws://host:8000`).
    pub fn chat(base_url: &str) -> Self {
        Self::new("chat", join(base_url, CHAT_CHANNEL), Arc::new(ChatClassifier))
    }

    /// The admin channel of the server at `base_url`.
    pub fn admin(base_url: &str) -> Self {
        Self::new("admin", join(base_url, ADMIN_CHANNEL), Arc::new(AdminClassifier))
    }
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

//! Well-known backend paths.

/// Real-time chat channel.
pub const CHAT_CHANNEL: &str = "/ws/chat";

/// Real-time admin channel. Same framing as the chat channel.
pub const ADMIN_CHANNEL: &str = "/ws/admin";

/// Prefix of the HTTP fallback API.
pub const HTTP_CHAT_PREFIX: &str = "/api/chat";

/// Server health check.
pub const HEALTH: &str = "/health";

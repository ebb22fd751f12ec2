//! Conversation state.
//!
//! The ordered message list for one session plus the status a front end
//! needs to render it: whether the assistant is typing, the link state and
//! active notifications. Mutated by user input ([`Conversation::send_user_message`])
//! and by channel events ([`Conversation::handle_event`] for the chat
//! channel, [`Conversation::handle_admin_event`] for the admin channel).

use chrono::{DateTime, NaiveDateTime, Utc};
use tether_client::HistoryExchange;
use tether_core::{ChannelEvent, Environment, EventKind};
use tether_proto::{InboundFrame, OutboundPayload, Role};

use crate::{
    error::{MAX_MESSAGE_CHARS, ValidationError},
    message::Message,
    notification::{Level, Notifications},
    summaries::ConversationSummary,
};

/// Prior exchanges sent as history with each chat message. An exchange is
/// a user message plus the replies that followed it.
pub const HISTORY_EXCHANGES: usize = 10;

/// Link status as the user sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Not connected.
    Disconnected,
    /// Connected.
    Connected,
    /// Waiting to retry.
    Reconnecting {
        /// Attempt number.
        attempt: u32,
    },
    /// Gave up reconnecting.
    Failed,
}

/// One session's conversation.
#[derive(Debug)]
pub struct Conversation<E: Environment> {
    env: E,
    id: String,
    messages: Vec<Message>,
    session_id: Option<String>,
    assistant_typing: bool,
    link: LinkStatus,
    notifications: Notifications,
}

impl<E: Environment> Conversation<E> {
    /// Empty conversation with no session.
    pub fn new(env: E) -> Self {
        let id = local_id(&env, "conv");
        Self {
            env,
            id,
            messages: Vec::new(),
            session_id: None,
            assistant_typing: false,
            link: LinkStatus::Disconnected,
            notifications: Notifications::default(),
        }
    }

    /// Empty conversation continuing `session_id`.
    pub fn with_session(env: E, session_id: impl Into<String>) -> Self {
        let mut conversation = Self::new(env);
        conversation.resume_session(session_id);
        conversation
    }

    /// Attach to an existing server session, keeping the messages.
    pub fn resume_session(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Local conversation id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Server session, once known.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether an assistant reply is pending.
    pub fn is_assistant_typing(&self) -> bool {
        self.assistant_typing
    }

    /// Link status.
    pub fn link(&self) -> LinkStatus {
        self.link
    }

    /// Active notifications.
    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Raise a notification.
    pub fn notify(&mut self, level: Level, text: impl Into<String>) {
        self.notifications.push(level, text, self.env.now());
    }

    /// Drop expired notifications. Returns whether any were dropped.
    pub fn prune_notifications(&mut self) -> bool {
        self.notifications.prune(self.env.now()) > 0
    }

    /// Summary for the saved-conversation list.
    pub fn summary(&self) -> Option<ConversationSummary> {
        ConversationSummary::from_messages(&self.id, &self.messages)
    }

    /// Validate and record a user message.
    ///
    /// Returns the outbound chat payload, carrying the session id and the
    /// last [`HISTORY_EXCHANGES`] prior exchanges. Marks the assistant as
    /// typing.
    pub fn send_user_message(&mut self, text: &str) -> Result<OutboundPayload, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty);
        }
        let len = text.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ValidationError::TooLong { len, max: MAX_MESSAGE_CHARS });
        }

        let start = self
            .messages
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, message)| message.role == Role::User)
            .nth(HISTORY_EXCHANGES - 1)
            .map_or(0, |(index, _)| index);
        let history = self.messages[start..].iter().map(Message::as_turn).collect();

        let id = local_id(&self.env, "user");
        self.messages.push(Message::user(id, text.to_string(), self.env.wall_clock()));
        self.assistant_typing = true;

        Ok(OutboundPayload::message(text, self.session_id.clone(), history))
    }

    /// Apply a channel event. Returns whether anything visible changed.
    pub fn handle_event(&mut self, event: &ChannelEvent) -> bool {
        match event {
            ChannelEvent::Connected => {
                self.link = LinkStatus::Connected;
                self.notify(Level::Success, "Connected");
            },
            ChannelEvent::Disconnected { code, .. } => {
                self.link = LinkStatus::Disconnected;
                self.assistant_typing = false;
                if code.is_intentional() {
                    self.notify(Level::Info, "Disconnected");
                } else {
                    self.notify(Level::Warning, format!("Connection lost ({code})"));
                }
            },
            ChannelEvent::TransportError { message } => {
                self.notify(Level::Error, format!("Connection error: {message}"));
            },
            ChannelEvent::Reconnecting { attempt, delay } => {
                self.link = LinkStatus::Reconnecting { attempt: *attempt };
                self.notify(
                    Level::Info,
                    format!("Reconnecting in {}s (attempt {attempt})", delay.as_secs_f32()),
                );
            },
            ChannelEvent::ReconnectExhausted { attempts } => {
                self.link = LinkStatus::Failed;
                self.notify(
                    Level::Warning,
                    format!("Could not reconnect after {attempts} attempts. Use /connect to retry."),
                );
            },
            ChannelEvent::Inbound { kind, frame } => return self.handle_frame(*kind, frame),
        }
        true
    }

    fn handle_frame(&mut self, kind: EventKind, frame: &InboundFrame) -> bool {
        match kind {
            EventKind::Message => {
                if self.session_id.is_none() {
                    self.session_id = frame.session_id().map(str::to_string);
                }
                let timestamp =
                    frame.timestamp().and_then(parse_timestamp).unwrap_or_else(|| self.env.wall_clock());
                let id = local_id(&self.env, "bot");
                self.messages.push(Message::assistant(
                    id,
                    frame.text().unwrap_or_default().to_string(),
                    timestamp,
                    frame.confidence(),
                    frame.context().cloned(),
                ));
                self.assistant_typing = false;
            },
            EventKind::Typing => {
                self.assistant_typing = frame.is_typing().unwrap_or(false);
            },
            EventKind::Error => {
                self.assistant_typing = false;
                let text = frame.text().unwrap_or("unknown server error").to_string();
                self.notify(Level::Error, text);
            },
            EventKind::ContextUpdated => self.notify(Level::Success, "Preferences updated"),
            EventKind::AdminBroadcast
            | EventKind::AdminStats
            | EventKind::ConnectionStats
            | EventKind::BroadcastSent => return self.admin_frame(kind, frame),
            EventKind::Pong => return false,
            _ => {
                tracing::debug!(kind = frame.kind(), "ignoring frame");
                return false;
            },
        }
        true
    }

    /// Apply an admin-channel event. Only posts notifications: the link
    /// status, typing state and transcript belong to the chat channel.
    pub fn handle_admin_event(&mut self, event: &ChannelEvent) -> bool {
        match event {
            ChannelEvent::Connected => self.notify(Level::Info, "Admin channel connected"),
            ChannelEvent::Disconnected { code, .. } => {
                if code.is_intentional() {
                    return false;
                }
                self.notify(Level::Warning, format!("Admin channel lost ({code})"));
            },
            ChannelEvent::TransportError { message } => {
                self.notify(Level::Error, format!("Admin channel error: {message}"));
            },
            ChannelEvent::Reconnecting { .. } => return false,
            ChannelEvent::ReconnectExhausted { attempts } => {
                self.notify(
                    Level::Warning,
                    format!("Admin channel unavailable after {attempts} attempts"),
                );
            },
            ChannelEvent::Inbound { kind: EventKind::Error, frame } => {
                let text = frame.text().unwrap_or("unknown server error");
                self.notify(Level::Error, format!("Admin: {text}"));
            },
            ChannelEvent::Inbound { kind, frame } => return self.admin_frame(*kind, frame),
        }
        true
    }

    fn admin_frame(&mut self, kind: EventKind, frame: &InboundFrame) -> bool {
        match kind {
            EventKind::AdminBroadcast => {
                let text = frame.text().unwrap_or_default().to_string();
                self.notify(Level::Info, format!("Broadcast: {text}"));
            },
            EventKind::AdminStats => {
                let stats = frame.get("stats");
                let field = |name: &str| {
                    stats.and_then(|s| s.get(name)).and_then(serde_json::Value::as_u64).unwrap_or(0)
                };
                self.notify(
                    Level::Info,
                    format!(
                        "Active connections: {}, sessions: {}",
                        field("active_connections"),
                        field("total_sessions")
                    ),
                );
            },
            EventKind::ConnectionStats => {
                let count = frame
                    .get("connections")
                    .and_then(serde_json::Value::as_array)
                    .map_or(0, Vec::len);
                self.notify(Level::Info, format!("Open connections: {count}"));
            },
            EventKind::BroadcastSent => self.notify(Level::Success, "Broadcast sent"),
            _ => {
                tracing::debug!(kind = frame.kind(), "ignoring admin frame");
                return false;
            },
        }
        true
    }

    /// Start a fresh session: messages cleared, session forgotten.
    pub fn reset_session(&mut self) {
        self.id = local_id(&self.env, "conv");
        self.messages.clear();
        self.session_id = None;
        self.assistant_typing = false;
    }

    /// Replace the messages with stored history for `session_id`.
    ///
    /// `exchanges` are newest first, as returned by the server. Each becomes
    /// a user entry followed by an assistant entry. Returns the number of
    /// entries added.
    pub fn seed_from_history(&mut self, session_id: &str, exchanges: &[HistoryExchange]) -> usize {
        self.messages.clear();
        self.session_id = Some(session_id.to_string());

        for exchange in exchanges.iter().rev() {
            let timestamp = exchange
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(|| self.env.wall_clock());

            let user_id = local_id(&self.env, "user");
            self.messages.push(Message::user(user_id, exchange.user_message.clone(), timestamp));

            let bot_id = local_id(&self.env, "bot");
            self.messages.push(Message::assistant(
                bot_id,
                exchange.ai_response.clone(),
                timestamp,
                exchange.confidence,
                exchange.context.clone(),
            ));
        }
        self.messages.len()
    }
}

fn local_id<E: Environment>(env: &E, prefix: &str) -> String {
    let mut suffix = [0u8; 4];
    env.random_bytes(&mut suffix);
    format!("{prefix}_{}_{}", env.wall_clock().timestamp_millis(), hex::encode(suffix))
}

/// Parse RFC 3339, or a naive ISO 8601 timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use chrono::TimeZone;
    use serde_json::{Map, json};
    use tether_proto::{CloseCode, Role};

    use super::*;
    use crate::testing::FixedEnv;

    fn reply(text: &str, confidence: f64) -> ChannelEvent {
        let mut fields = Map::new();
        fields.insert("message".into(), json!(text));
        fields.insert("confidence".into(), json!(confidence));
        fields.insert("session_id".into(), json!("s1"));
        ChannelEvent::Inbound {
            kind: EventKind::Message,
            frame: InboundFrame::new("response", fields),
        }
    }

    fn history_of(payload: &OutboundPayload) -> Vec<String> {
        match payload {
            OutboundPayload::Message { history, .. } => {
                history.iter().map(|t| t.content.clone()).collect()
            },
            _ => Vec::new(),
        }
    }

    #[test]
    fn rejects_empty_and_oversized_messages() {
        let mut conversation = Conversation::new(FixedEnv::new());

        assert_eq!(conversation.send_user_message("   \n"), Err(ValidationError::Empty));

        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            conversation.send_user_message(&long),
            Err(ValidationError::TooLong { len: MAX_MESSAGE_CHARS + 1, max: MAX_MESSAGE_CHARS })
        );

        let exact = "ñ".repeat(MAX_MESSAGE_CHARS);
        assert!(conversation.send_user_message(&exact).is_ok());
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn send_trims_appends_and_marks_typing() {
        let mut conversation = Conversation::with_session(FixedEnv::new(), "s1");

        let payload = conversation.send_user_message("  hola  ").unwrap();
        assert_eq!(payload, OutboundPayload::message("hola", Some("s1".into()), vec![]));
        assert_eq!(conversation.messages()[0].content, "hola");
        assert_eq!(conversation.messages()[0].role, Role::User);
        assert!(conversation.is_assistant_typing());
    }

    #[test]
    fn history_is_last_ten_prior_exchanges() {
        let mut conversation = Conversation::new(FixedEnv::new());
        for i in 0..12 {
            conversation.send_user_message(&format!("q{i}")).unwrap();
            conversation.handle_event(&reply(&format!("a{i}"), 0.5));
        }
        assert_eq!(conversation.messages().len(), 24);

        let payload = conversation.send_user_message("next").unwrap();
        let history = history_of(&payload);
        assert_eq!(history.len(), 2 * HISTORY_EXCHANGES);
        assert_eq!(history[0], "q2");
        assert_eq!(history[1], "a2");
        assert_eq!(history[19], "a11");
    }

    #[test]
    fn unanswered_messages_count_as_exchanges() {
        let mut conversation = Conversation::new(FixedEnv::new());
        conversation.handle_event(&reply("welcome", 0.5));
        for i in 0..3 {
            conversation.send_user_message(&format!("q{i}")).unwrap();
        }
        conversation.handle_event(&reply("a2", 0.5));

        let history = history_of(&conversation.send_user_message("next").unwrap());
        assert_eq!(history, vec!["welcome", "q0", "q1", "q2", "a2"]);

        for i in 0..HISTORY_EXCHANGES {
            conversation.send_user_message(&format!("r{i}")).unwrap();
        }
        let history = history_of(&conversation.send_user_message("last").unwrap());
        assert_eq!(history.len(), HISTORY_EXCHANGES);
        assert_eq!(history[0], "r0");
    }

    #[test]
    fn reply_appends_assistant_entry_and_adopts_session() {
        let mut conversation = Conversation::new(FixedEnv::new());
        conversation.send_user_message("hola").unwrap();

        assert!(conversation.handle_event(&reply("¡Hola!", 0.9)));

        let last = conversation.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "¡Hola!");
        assert_eq!(last.confidence, Some(0.9));
        assert!(!conversation.is_assistant_typing());
        assert_eq!(conversation.session_id(), Some("s1"));
    }

    #[test]
    fn typing_and_error_frames() {
        let mut conversation = Conversation::new(FixedEnv::new());

        let mut fields = Map::new();
        fields.insert("is_typing".into(), json!(true));
        conversation.handle_event(&ChannelEvent::Inbound {
            kind: EventKind::Typing,
            frame: InboundFrame::new("typing", fields),
        });
        assert!(conversation.is_assistant_typing());

        let mut fields = Map::new();
        fields.insert("message".into(), json!("Error procesando mensaje"));
        conversation.handle_event(&ChannelEvent::Inbound {
            kind: EventKind::Error,
            frame: InboundFrame::new("error", fields),
        });
        assert!(!conversation.is_assistant_typing());

        let now = Instant::now();
        let notice = conversation.notifications().visible(now).last().unwrap();
        assert_eq!(notice.level, Level::Error);
        assert_eq!(notice.text, "Error procesando mensaje");
    }

    #[test]
    fn link_status_follows_lifecycle_events() {
        let mut conversation = Conversation::new(FixedEnv::new());

        conversation.handle_event(&ChannelEvent::Connected);
        assert_eq!(conversation.link(), LinkStatus::Connected);

        conversation.handle_event(&ChannelEvent::Disconnected {
            code: CloseCode::ABNORMAL,
            reason: String::new(),
        });
        conversation.handle_event(&ChannelEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_secs(1),
        });
        assert_eq!(conversation.link(), LinkStatus::Reconnecting { attempt: 1 });

        conversation.handle_event(&ChannelEvent::ReconnectExhausted { attempts: 5 });
        assert_eq!(conversation.link(), LinkStatus::Failed);

        let levels: Vec<_> =
            conversation.notifications().visible(Instant::now()).map(|n| n.level).collect();
        assert_eq!(levels, vec![Level::Success, Level::Warning, Level::Info, Level::Warning]);
    }

    #[test]
    fn pong_and_unknown_frames_change_nothing() {
        let mut conversation = Conversation::new(FixedEnv::new());
        let pong = ChannelEvent::Inbound {
            kind: EventKind::Pong,
            frame: InboundFrame::new("pong", Map::new()),
        };
        let unknown = ChannelEvent::Inbound {
            kind: EventKind::Unknown,
            frame: InboundFrame::new("mystery", Map::new()),
        };
        assert!(!conversation.handle_event(&pong));
        assert!(!conversation.handle_event(&unknown));
        assert!(conversation.notifications().is_empty());
    }

    #[test]
    fn reset_clears_messages_and_session() {
        let mut conversation = Conversation::with_session(FixedEnv::new(), "s1");
        let first_id = conversation.id().to_string();
        conversation.send_user_message("hola").unwrap();

        conversation.reset_session();
        assert!(conversation.messages().is_empty());
        assert_eq!(conversation.session_id(), None);
        assert!(!conversation.is_assistant_typing());
        assert_ne!(conversation.id(), first_id);
    }

    #[test]
    fn seed_from_history_restores_chronological_order() {
        let mut conversation = Conversation::new(FixedEnv::new());
        let exchanges = vec![
            HistoryExchange {
                user_message: "second".into(),
                ai_response: "b".into(),
                context: None,
                confidence: Some(0.7),
                timestamp: Some("2026-01-01T00:01:00.250000".into()),
            },
            HistoryExchange {
                user_message: "first".into(),
                ai_response: "a".into(),
                context: None,
                confidence: Some(0.8),
                timestamp: Some("2026-01-01T00:00:00".into()),
            },
        ];

        assert_eq!(conversation.seed_from_history("s9", &exchanges), 4);

        let contents: Vec<_> = conversation.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "a", "second", "b"]);
        assert_eq!(conversation.session_id(), Some("s9"));
        assert_eq!(
            conversation.messages()[2].timestamp,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap() + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive() {
        assert!(parse_timestamp("2026-01-01T00:00:00Z").is_some());
        assert!(parse_timestamp("2026-01-01T00:00:00.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}

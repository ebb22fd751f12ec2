//! Application state machine
//!
//! [`App`] owns the conversation, settings and saved-conversation list. It
//! performs no I/O beyond the [`Storage`] it is given: every event goes
//! through [`App::handle`], which returns the actions the runtime must
//! execute.

use tether_core::{ChannelEvent, Environment, EventKind};
use tether_proto::OutboundPayload;

use crate::{
    action::AppAction,
    conversation::Conversation,
    event::{AppEvent, ChannelRole},
    notification::Level,
    settings::{MAX_FONT_SIZE, MIN_FONT_SIZE, Settings},
    storage::Storage,
    summaries::ConversationList,
};

/// Exchanges requested when loading history.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Application state.
pub struct App<E: Environment, S: Storage> {
    conversation: Conversation<E>,
    settings: Settings,
    summaries: ConversationList,
    storage: S,
    admin_enabled: bool,
    history_limit: u32,
}

impl<E: Environment, S: Storage> App<E, S> {
    /// Load settings and saved conversations from `storage` and start an
    /// empty conversation.
    pub fn new(env: E, storage: S) -> Self {
        let settings = Settings::load(&storage);
        let summaries = ConversationList::load(&storage);
        Self {
            conversation: Conversation::new(env),
            settings,
            summaries,
            storage,
            admin_enabled: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Continue an existing server session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.conversation.resume_session(session_id);
        self
    }

    /// Allow admin-channel requests.
    #[must_use]
    pub fn with_admin(mut self, enabled: bool) -> Self {
        self.admin_enabled = enabled;
        self
    }

    /// Exchanges requested by [`AppEvent::LoadHistory`].
    #[must_use]
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    /// Current conversation.
    pub fn conversation(&self) -> &Conversation<E> {
        &self.conversation
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Saved conversations.
    pub fn summaries(&self) -> &ConversationList {
        &self.summaries
    }

    /// Backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Whether admin requests are accepted.
    pub fn admin_enabled(&self) -> bool {
        self.admin_enabled
    }

    /// Process one event.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Submit(text) => match self.conversation.send_user_message(&text) {
                Ok(payload) => {
                    self.persist_summary();
                    vec![AppAction::Send(payload), AppAction::Render]
                },
                Err(error) => {
                    self.conversation.notify(Level::Error, error.to_string());
                    vec![AppAction::Render]
                },
            },

            AppEvent::Connect => vec![AppAction::Connect, AppAction::Render],
            AppEvent::Disconnect => vec![AppAction::Disconnect, AppAction::Render],

            AppEvent::NewSession => {
                self.persist_summary();
                self.conversation.reset_session();
                self.conversation.notify(Level::Info, "New conversation started");
                vec![AppAction::Render]
            },

            AppEvent::LoadHistory => match self.conversation.session_id() {
                Some(session_id) => vec![AppAction::FetchHistory {
                    session_id: session_id.to_string(),
                    limit: self.history_limit,
                }],
                None => {
                    self.conversation.notify(Level::Warning, "No session yet, nothing to load");
                    vec![AppAction::Render]
                },
            },

            AppEvent::HistoryLoaded { session_id, exchanges } => {
                let added = self.conversation.seed_from_history(&session_id, &exchanges);
                self.persist_summary();
                self.conversation.notify(Level::Success, format!("Loaded {added} messages"));
                vec![AppAction::Render]
            },

            AppEvent::HistoryFailed(reason) => {
                self.conversation.notify(Level::Error, format!("Could not load history: {reason}"));
                vec![AppAction::Render]
            },

            AppEvent::SetTheme(theme) => {
                self.settings.theme = theme;
                self.persist_settings(format!("Theme set to {theme}"));
                vec![AppAction::Render]
            },

            AppEvent::SetPersonality(personality) => {
                self.settings.personality = personality;
                self.persist_settings(format!("Personality set to {}", self.settings.personality));
                vec![AppAction::Send(self.context_update()), AppAction::Render]
            },

            AppEvent::SetResponseLength(length) => {
                self.settings.response_length = length;
                self.persist_settings(format!("Response length set to {length}"));
                vec![AppAction::Send(self.context_update()), AppAction::Render]
            },

            AppEvent::SetFontSize(size) => {
                if (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
                    self.settings.font_size = size;
                    self.persist_settings(format!("Font size set to {size}px"));
                } else {
                    self.conversation.notify(
                        Level::Warning,
                        format!("Font size must be between {MIN_FONT_SIZE} and {MAX_FONT_SIZE}"),
                    );
                }
                vec![AppAction::Render]
            },

            AppEvent::Typing(is_typing) => {
                vec![AppAction::Send(OutboundPayload::Typing { is_typing, user_id: None })]
            },

            AppEvent::Admin(request) => {
                if self.admin_enabled {
                    vec![AppAction::Admin(request)]
                } else {
                    self.conversation.notify(Level::Warning, "Admin channel is disabled");
                    vec![AppAction::Render]
                }
            },

            AppEvent::DeleteConversation(id) => {
                if self.summaries.delete(&id) {
                    self.persist_list();
                    self.conversation.notify(Level::Success, "Conversation deleted");
                } else {
                    self.conversation.notify(Level::Warning, format!("No conversation {id}"));
                }
                vec![AppAction::Render]
            },

            AppEvent::Channel { role, event } => self.handle_channel(role, &event),

            AppEvent::Tick => {
                if self.conversation.prune_notifications() {
                    vec![AppAction::Render]
                } else {
                    Vec::new()
                }
            },

            AppEvent::Quit => {
                self.persist_summary();
                vec![AppAction::Quit]
            },
        }
    }

    fn handle_channel(&mut self, role: ChannelRole, event: &ChannelEvent) -> Vec<AppAction> {
        let changed = match role {
            ChannelRole::Chat => self.conversation.handle_event(event),
            ChannelRole::Admin => self.conversation.handle_admin_event(event),
        };
        if !changed {
            return Vec::new();
        }
        if role == ChannelRole::Chat && event.kind() == EventKind::Message {
            self.persist_summary();
        }
        vec![AppAction::Render]
    }

    fn context_update(&self) -> OutboundPayload {
        let (preferences, personality) = self.settings.context_fields();
        OutboundPayload::ContextUpdate {
            session_id: self.conversation.session_id().map(str::to_string),
            preferences: Some(preferences),
            topics: None,
            personality: Some(personality),
        }
    }

    fn persist_settings(&mut self, confirmation: String) {
        match self.settings.save(&mut self.storage) {
            Ok(()) => self.conversation.notify(Level::Success, confirmation),
            Err(error) => {
                tracing::warn!(%error, "saving settings failed");
                self.conversation.notify(Level::Error, format!("Could not save settings: {error}"));
            },
        }
    }

    fn persist_summary(&mut self) {
        let Some(summary) = self.conversation.summary() else {
            return;
        };
        self.summaries.upsert(summary);
        self.persist_list();
    }

    fn persist_list(&mut self) {
        if let Err(error) = self.summaries.save(&mut self.storage) {
            tracing::warn!(%error, "saving conversations failed");
            self.conversation.notify(Level::Error, format!("Could not save conversations: {error}"));
        }
    }
}

impl<E: Environment, S: Storage> std::fmt::Debug for App<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("conversation", &self.conversation.id())
            .field("messages", &self.conversation.messages().len())
            .field("settings", &self.settings)
            .field("summaries", &self.summaries.len())
            .field("admin_enabled", &self.admin_enabled)
            .finish_non_exhaustive()
    }
}

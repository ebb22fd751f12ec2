//! Runtime bridge
//!
//! Connects the pure [`crate::App`] to live channels. Channel events are
//! forwarded into the application's event stream; [`AppAction`]s are
//! executed against the channel handles and the HTTP fallback.

use tether_client::{ChannelHandle, HttpFallback};
use tether_core::{EventKind, ListenerError, listener};
use tokio::sync::mpsc;

use crate::{
    action::AppAction,
    event::{AdminRequest, AppEvent, ChannelRole},
};

/// Executes [`AppAction`]s.
#[derive(Debug, Clone)]
pub struct Bridge {
    chat: ChannelHandle,
    admin: Option<ChannelHandle>,
    http: Option<HttpFallback>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl Bridge {
    /// Bridge over `chat`, feeding results into `events`.
    pub fn new(chat: ChannelHandle, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { chat, admin: None, http: None, events }
    }

    /// Route admin requests to `admin`.
    #[must_use]
    pub fn with_admin(mut self, admin: ChannelHandle) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Fetch history through `http`.
    #[must_use]
    pub fn with_http(mut self, http: HttpFallback) -> Self {
        self.http = Some(http);
        self
    }

    /// Forward every event of every channel into the application stream,
    /// tagged with the channel it came from.
    pub fn subscribe(&self) {
        let admin = self.admin.as_ref().map(|handle| (ChannelRole::Admin, handle));
        for (role, handle) in std::iter::once((ChannelRole::Chat, &self.chat)).chain(admin) {
            let events = self.events.clone();
            let forward = listener(move |event| {
                events
                    .send(AppEvent::Channel { role, event: event.clone() })
                    .map_err(|_| ListenerError::new("application event stream closed"))
            });
            for kind in EventKind::ALL {
                handle.on(kind, forward.clone());
            }
        }
    }

    /// Execute one action. [`AppAction::Render`] and [`AppAction::Quit`]
    /// belong to the front end and are ignored here.
    pub fn execute(&self, action: AppAction) {
        match action {
            AppAction::Connect => {
                self.chat.connect();
                if let Some(admin) = &self.admin {
                    admin.connect();
                }
            },
            AppAction::Disconnect => {
                self.chat.disconnect();
                if let Some(admin) = &self.admin {
                    admin.disconnect();
                }
            },
            AppAction::Send(payload) => self.chat.send(payload),
            AppAction::Admin(request) => self.admin(request),
            AppAction::FetchHistory { session_id, limit } => self.fetch_history(session_id, limit),
            AppAction::Render | AppAction::Quit => {},
        }
    }

    fn admin(&self, request: AdminRequest) {
        let Some(admin) = &self.admin else {
            tracing::warn!(?request, "no admin channel, request dropped");
            return;
        };
        match request {
            AdminRequest::Stats => admin.get_stats(),
            AdminRequest::Connections => admin.get_connections(),
            AdminRequest::Broadcast(message) => admin.broadcast(message),
        }
    }

    fn fetch_history(&self, session_id: String, limit: u32) {
        let Some(http) = self.http.clone() else {
            let _ = self.events.send(AppEvent::HistoryFailed("no HTTP endpoint configured".into()));
            return;
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match http.history(&session_id, limit).await {
                Ok(page) => AppEvent::HistoryLoaded { session_id, exchanges: page.history },
                Err(error) => {
                    tracing::warn!(%session_id, %error, "history fetch failed");
                    AppEvent::HistoryFailed(error.to_string())
                },
            };
            let _ = events.send(event);
        });
    }
}

//! Line-oriented terminal renderer.
//!
//! Prints only what changed since the last render: new messages, new
//! notifications and the typing indicator. A conversation that was replaced
//! (new session, loaded history) is reprinted from the start.

use std::{
    collections::HashSet,
    io::{self, Write},
    time::Instant,
};

use tether_app::{App, ConversationList, Message, Notification, Settings, Storage, Theme};
use tether_core::Environment;
use tether_proto::Role;

/// ANSI colours for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    user: &'static str,
    assistant: &'static str,
    notice: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self { user: "\x1b[34m", assistant: "\x1b[32m", notice: "\x1b[33m" },
            Theme::Dark => Self { user: "\x1b[96m", assistant: "\x1b[92m", notice: "\x1b[93m" },
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Help text for `/help`.
pub const HELP: &str = "\
Commands:
  /connect, /disconnect          open or close the connection
  /new                           start a new conversation
  /history                       load stored history for this session
  /theme <light|dark>            colour scheme
  /personality <name>            assistant personality
  /length <short|medium|long>    preferred answer length
  /font <px>                     font size
  /typing on|off                 send a typing indicator
  /admin stats|connections       admin channel queries
  /admin broadcast <text>        message every connected client
  /conversations, /delete <id>   saved conversations
  /stats, /feedback <1-5> [text] session statistics and rating
  /quit                          exit";

/// Incremental renderer over any writer.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
    conversation_id: Option<String>,
    printed: usize,
    last_printed: Option<String>,
    seen_notices: HashSet<(Instant, String)>,
    typing_shown: bool,
}

impl<W: Write> Renderer<W> {
    /// Plain renderer.
    pub fn new(out: W) -> Self {
        Self {
            out,
            color: false,
            conversation_id: None,
            printed: 0,
            last_printed: None,
            seen_notices: HashSet::new(),
            typing_shown: false,
        }
    }

    /// Enable ANSI colours.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Startup banner.
    pub fn banner(&mut self, settings: &Settings, session_id: Option<&str>) -> io::Result<()> {
        writeln!(self.out, "tether chat, type /help for commands")?;
        writeln!(
            self.out,
            "theme {}, personality {}, length {}, font {}px",
            settings.theme, settings.personality, settings.response_length, settings.font_size
        )?;
        if let Some(session_id) = session_id {
            writeln!(self.out, "resuming session {session_id}")?;
        }
        self.out.flush()
    }

    /// Print whatever changed in `app` since the last call.
    pub fn render<E: Environment, S: Storage>(
        &mut self,
        app: &App<E, S>,
        now: Instant,
    ) -> io::Result<()> {
        let conversation = app.conversation();
        let palette = Palette::for_theme(app.settings().theme);
        let messages = conversation.messages();

        if self.needs_reprint(conversation.id(), messages) {
            if self.conversation_id.is_some() {
                writeln!(self.out, "--- conversation {} ---", conversation.id())?;
            }
            self.printed = 0;
        }
        self.conversation_id = Some(conversation.id().to_string());

        for message in &messages[self.printed..] {
            let line = format_message(message);
            let color = match message.role {
                Role::User => palette.user,
                Role::Assistant => palette.assistant,
            };
            self.write_colored(color, &line)?;
        }
        self.printed = messages.len();
        self.last_printed = messages.last().map(|m| m.id.clone());

        self.seen_notices.retain(|(expires_at, _)| *expires_at > now);
        for notice in conversation.notifications().visible(now) {
            if self.seen_notices.insert((notice.expires_at, notice.text.clone())) {
                self.write_colored(palette.notice, &format_notification(notice))?;
            }
        }

        let typing = conversation.is_assistant_typing();
        if typing && !self.typing_shown {
            writeln!(self.out, "  bot is typing...")?;
        }
        self.typing_shown = typing;

        self.out.flush()
    }

    /// Print the saved-conversation list.
    pub fn conversations(&mut self, list: &ConversationList) -> io::Result<()> {
        if list.is_empty() {
            writeln!(self.out, "no saved conversations")?;
            return self.out.flush();
        }
        for summary in list.list() {
            writeln!(
                self.out,
                "{}  {}  {} ({} messages)",
                summary.timestamp.format("%Y-%m-%d %H:%M"),
                summary.id,
                summary.title,
                summary.message_count
            )?;
            writeln!(self.out, "    {}", summary.preview)?;
        }
        self.out.flush()
    }

    /// Print one informational line.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn needs_reprint(&self, id: &str, messages: &[Message]) -> bool {
        if self.conversation_id.as_deref() != Some(id) || messages.len() < self.printed {
            return true;
        }
        self.printed > 0 && messages.get(self.printed - 1).map(|m| &m.id) != self.last_printed.as_ref()
    }

    fn write_colored(&mut self, color: &str, line: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{color}{line}{RESET}")
        } else {
            writeln!(self.out, "{line}")
        }
    }
}

/// `[HH:MM] you: text` or `[HH:MM] bot: text (NN%)`.
pub fn format_message(message: &Message) -> String {
    let time = message.timestamp.format("%H:%M");
    match message.role {
        Role::User => format!("[{time}] you: {}", message.content),
        Role::Assistant => match message.confidence {
            Some(confidence) => {
                format!("[{time}] bot: {} ({:.0}%)", message.content, confidence * 100.0)
            },
            None => format!("[{time}] bot: {}", message.content),
        },
    }
}

/// `[level] text`.
pub fn format_notification(notice: &Notification) -> String {
    format!("[{}] {}", notice.level, notice.text)
}

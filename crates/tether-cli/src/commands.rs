//! Command parsing for the terminal client.
//!
//! This module parses input lines into structured [`Command`] values.

use tether_app::{AdminRequest, AppEvent, ResponseLength, Theme};

/// Parsed command from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect to the server.
    Connect,

    /// Close the connection.
    Disconnect,

    /// Start a fresh session.
    NewSession,

    /// Load stored history for the current session.
    History,

    /// Change the colour scheme.
    Theme {
        /// New theme.
        theme: Theme,
    },

    /// Change the assistant personality.
    Personality {
        /// Personality name.
        name: String,
    },

    /// Change the preferred answer length.
    Length {
        /// New length.
        length: ResponseLength,
    },

    /// Change the font size.
    Font {
        /// Size in pixels.
        size: u8,
    },

    /// Send a typing indicator.
    Typing {
        /// Whether the user is typing.
        on: bool,
    },

    /// Admin-channel request.
    Admin(AdminRequest),

    /// List saved conversations.
    Conversations,

    /// Delete a saved conversation.
    Delete {
        /// Conversation id.
        id: String,
    },

    /// Show session statistics.
    Stats,

    /// Rate the session.
    Feedback {
        /// Rating from 1 to 5.
        rating: u8,
        /// Free text.
        comment: String,
    },

    /// Show the command list.
    Help,

    /// Quit the application.
    Quit,

    /// Send a chat message.
    Message {
        /// Message content.
        content: String,
    },

    /// Unknown or invalid command.
    Unknown {
        /// The original input.
        input: String,
    },

    /// Command with missing or invalid arguments.
    InvalidArgs {
        /// Command name.
        command: String,
        /// Error message.
        error: String,
    },
}

impl Command {
    /// The application event this command maps to, if it is handled by the
    /// application state rather than the terminal itself.
    pub fn app_event(&self) -> Option<AppEvent> {
        let event = match self {
            Self::Connect => AppEvent::Connect,
            Self::Disconnect => AppEvent::Disconnect,
            Self::NewSession => AppEvent::NewSession,
            Self::History => AppEvent::LoadHistory,
            Self::Theme { theme } => AppEvent::SetTheme(*theme),
            Self::Personality { name } => AppEvent::SetPersonality(name.clone()),
            Self::Length { length } => AppEvent::SetResponseLength(*length),
            Self::Font { size } => AppEvent::SetFontSize(*size),
            Self::Typing { on } => AppEvent::Typing(*on),
            Self::Admin(request) => AppEvent::Admin(request.clone()),
            Self::Delete { id } => AppEvent::DeleteConversation(id.clone()),
            Self::Quit => AppEvent::Quit,
            Self::Message { content } => AppEvent::Submit(content.clone()),
            Self::Conversations
            | Self::Stats
            | Self::Feedback { .. }
            | Self::Help
            | Self::Unknown { .. }
            | Self::InvalidArgs { .. } => return None,
        };
        Some(event)
    }
}

fn invalid(command: &str, error: impl Into<String>) -> Command {
    Command::InvalidArgs { command: command.into(), error: error.into() }
}

/// Parse a user input line into a command.
///
/// Commands start with `/`. Anything else is treated as a message.
pub fn parse(input: &str) -> Command {
    let input = input.trim();

    let Some(cmd_str) = input.strip_prefix('/') else {
        return Command::Message { content: input.to_string() };
    };

    let (command, rest) = match cmd_str.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (cmd_str, ""),
    };

    match command {
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "new" => Command::NewSession,
        "history" => Command::History,

        "theme" => match Theme::parse(rest) {
            Some(theme) => Command::Theme { theme },
            None => invalid("theme", "Usage: /theme <light|dark>"),
        },

        "personality" => {
            if rest.is_empty() {
                invalid("personality", "Usage: /personality <name>")
            } else {
                Command::Personality { name: rest.to_string() }
            }
        },

        "length" => match ResponseLength::parse(rest) {
            Some(length) => Command::Length { length },
            None => invalid("length", "Usage: /length <short|medium|long>"),
        },

        "font" => match rest.parse::<u8>() {
            Ok(size) => Command::Font { size },
            Err(_) => invalid("font", "Usage: /font <px>"),
        },

        "typing" => match rest {
            "on" => Command::Typing { on: true },
            "off" => Command::Typing { on: false },
            _ => invalid("typing", "Usage: /typing on|off"),
        },

        "admin" => {
            let (sub, text) = match rest.split_once(char::is_whitespace) {
                Some((sub, text)) => (sub, text.trim()),
                None => (rest, ""),
            };
            match sub {
                "stats" => Command::Admin(AdminRequest::Stats),
                "connections" => Command::Admin(AdminRequest::Connections),
                "broadcast" if !text.is_empty() => {
                    Command::Admin(AdminRequest::Broadcast(text.to_string()))
                },
                "broadcast" => invalid("admin", "Usage: /admin broadcast <text>"),
                _ => invalid("admin", "Usage: /admin stats|connections|broadcast <text>"),
            }
        },

        "conversations" => Command::Conversations,

        "delete" => {
            if rest.is_empty() {
                invalid("delete", "Usage: /delete <id>")
            } else {
                Command::Delete { id: rest.to_string() }
            }
        },

        "stats" => Command::Stats,

        "feedback" => {
            let (rating, comment) = match rest.split_once(char::is_whitespace) {
                Some((rating, comment)) => (rating, comment.trim()),
                None => (rest, ""),
            };
            match rating.parse::<u8>() {
                Ok(rating @ 1..=5) => Command::Feedback { rating, comment: comment.to_string() },
                _ => invalid("feedback", "Usage: /feedback <1-5> [comment]"),
            }
        },

        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,

        _ => Command::Unknown { input: input.to_string() },
    }
}

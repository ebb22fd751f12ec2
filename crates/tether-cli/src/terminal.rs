//! Terminal runtime.
//!
//! Reads input lines, feeds them through [`App::handle`] together with
//! channel events and a periodic tick, executes the resulting actions via
//! the [`Bridge`] and renders after every change.

use std::{io::Write, time::Duration};

use tether_app::{App, AppAction, AppEvent, Bridge, Storage};
use tether_client::{Feedback, HttpFallback, SessionStats, TokioEnv};
use tether_core::Environment;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
    time::MissedTickBehavior,
};

use crate::{
    commands::{self, Command},
    error::CliError,
    render::{HELP, Renderer},
};

/// Interval of [`AppEvent::Tick`].
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// The terminal client.
pub struct Terminal<S: Storage, W: Write> {
    app: App<TokioEnv, S>,
    bridge: Bridge,
    http: Option<HttpFallback>,
    events: mpsc::UnboundedReceiver<AppEvent>,
    renderer: Renderer<W>,
    replies_tx: mpsc::UnboundedSender<String>,
    replies: mpsc::UnboundedReceiver<String>,
    connect_on_start: bool,
    tick: Duration,
}

impl<S: Storage, W: Write> Terminal<S, W> {
    /// Terminal over `app`, executing through `bridge`, reading channel
    /// events from `events` and writing to `out`.
    pub fn new(
        app: App<TokioEnv, S>,
        bridge: Bridge,
        events: mpsc::UnboundedReceiver<AppEvent>,
        out: W,
    ) -> Self {
        let (replies_tx, replies) = mpsc::unbounded_channel();
        Self {
            app,
            bridge,
            http: None,
            events,
            renderer: Renderer::new(out),
            replies_tx,
            replies,
            connect_on_start: false,
            tick: DEFAULT_TICK,
        }
    }

    /// Use `http` for `/stats` and `/feedback`.
    #[must_use]
    pub fn with_http(mut self, http: HttpFallback) -> Self {
        self.http = Some(http);
        self
    }

    /// Enable ANSI colours.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.renderer = self.renderer.with_color(color);
        self
    }

    /// Connect before reading input.
    #[must_use]
    pub fn connect_on_start(mut self, connect: bool) -> Self {
        self.connect_on_start = connect;
        self
    }

    /// Run until `/quit` or end of input. Returns the output writer.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> Result<W, CliError> {
        self.renderer.banner(self.app.settings(), self.app.conversation().session_id())?;
        if self.connect_on_start && self.dispatch(AppEvent::Connect)? {
            return Ok(self.renderer.into_inner());
        }

        let mut lines = input.lines();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => match self.command(&line)? {
                        Some(event) => event,
                        None => continue,
                    },
                    None => AppEvent::Quit,
                },
                Some(event) = self.events.recv() => event,
                Some(reply) = self.replies.recv() => {
                    self.renderer.line(&reply)?;
                    continue;
                },
                _ = ticker.tick() => AppEvent::Tick,
            };

            if self.dispatch(event)? {
                break;
            }
        }

        tracing::debug!("terminal stopped");
        Ok(self.renderer.into_inner())
    }

    /// Apply one event. Returns whether the application asked to quit.
    fn dispatch(&mut self, event: AppEvent) -> Result<bool, CliError> {
        for action in self.app.handle(event) {
            match action {
                AppAction::Render => self.renderer.render(&self.app, TokioEnv.now())?,
                AppAction::Quit => return Ok(true),
                other => self.bridge.execute(other),
            }
        }
        Ok(false)
    }

    /// Parse a line. Commands the terminal handles itself return `None`.
    fn command(&mut self, line: &str) -> Result<Option<AppEvent>, CliError> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let command = commands::parse(line);
        if let Some(event) = command.app_event() {
            return Ok(Some(event));
        }

        match command {
            Command::Help => self.renderer.line(HELP)?,
            Command::Conversations => self.renderer.conversations(self.app.summaries())?,
            Command::Stats => self.stats()?,
            Command::Feedback { rating, comment } => self.feedback(rating, comment)?,
            Command::Unknown { input } => {
                self.renderer.line(&format!("unknown command {input}, type /help"))?;
            },
            Command::InvalidArgs { error, .. } => self.renderer.line(&error)?,
            _ => {},
        }
        Ok(None)
    }

    fn session(&mut self) -> Result<Option<(HttpFallback, String)>, CliError> {
        let Some(http) = self.http.clone() else {
            self.renderer.line("no HTTP endpoint configured")?;
            return Ok(None);
        };
        let Some(session_id) = self.app.conversation().session_id() else {
            self.renderer.line("no session yet, send a message first")?;
            return Ok(None);
        };
        Ok(Some((http, session_id.to_string())))
    }

    fn stats(&mut self) -> Result<(), CliError> {
        let Some((http, session_id)) = self.session()? else {
            return Ok(());
        };
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let reply = match http.stats(&session_id).await {
                Ok(stats) => format_stats(&stats),
                Err(error) => format!("stats unavailable: {error}"),
            };
            let _ = replies.send(reply);
        });
        Ok(())
    }

    fn feedback(&mut self, rating: u8, comment: String) -> Result<(), CliError> {
        let Some((http, session_id)) = self.session()? else {
            return Ok(());
        };
        let feedback = Feedback {
            session_id,
            conversation_id: Some(self.app.conversation().id().to_string()),
            rating,
            comment,
        };
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let reply = match http.feedback(&feedback).await {
                Ok(ack) => format!("feedback sent: {}", ack.message),
                Err(error) => format!("feedback failed: {error}"),
            };
            let _ = replies.send(reply);
        });
        Ok(())
    }
}

/// One-line summary of session statistics.
pub fn format_stats(stats: &SessionStats) -> String {
    let labels = |items: &[tether_client::LabelCount]| {
        if items.is_empty() {
            return "none".to_string();
        }
        items.iter().map(|l| format!("{} ({})", l.label, l.count)).collect::<Vec<_>>().join(", ")
    };
    format!(
        "{} messages, average confidence {:.0}%, topics: {}, emotions: {}",
        stats.message_count,
        stats.avg_confidence * 100.0,
        labels(stats.topics.as_slice()),
        labels(stats.emotions.as_slice())
    )
}

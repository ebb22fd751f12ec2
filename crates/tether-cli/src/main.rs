//! `tether` terminal chat client.

use std::{
    io::{self, IsTerminal},
    path::PathBuf,
    sync::Arc,
};

use clap::Parser;
use tether_app::{App, Bridge, FileStorage};
use tether_cli::{CliError, Terminal};
use tether_client::{ChannelDriver, HttpFallback, TcpDialer, TokioEnv};
use tether_core::{Channel, ConnectionConfig, EventBus, ReconnectPolicy};
use tokio::{io::BufReader, sync::mpsc};
use tracing_subscriber::EnvFilter;

/// Terminal chat client.
#[derive(Debug, Parser)]
#[command(name = "tether", version, about)]
struct Args {
    /// WebSocket base URL of the chat server.
    #[arg(long, default_value = "ws://localhost:8000")]
    server: String,

    /// HTTP base URL for history, stats and feedback.
    #[arg(long, default_value = "http://localhost:8000")]
    http: String,

    /// Resume an existing server session.
    #[arg(long)]
    session: Option<String>,

    /// Directory for settings and saved conversations.
    #[arg(long, default_value = ".tether")]
    data_dir: PathBuf,

    /// Reconnect attempts before giving up.
    #[arg(long, default_value_t = 5)]
    max_reconnect_attempts: u32,

    /// Also open the admin channel.
    #[arg(long)]
    admin: bool,

    /// Start without connecting.
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!(server = %args.server, data_dir = %args.data_dir.display(), "starting");

    let storage = FileStorage::open(&args.data_dir)?;
    let config = ConnectionConfig {
        reconnect: ReconnectPolicy {
            max_attempts: args.max_reconnect_attempts,
            ..ReconnectPolicy::default()
        },
        ..ConnectionConfig::default()
    };

    let chat = ChannelDriver::spawn(
        TokioEnv,
        TcpDialer,
        Channel::chat(&args.server),
        config.clone(),
        Arc::new(EventBus::new()),
    );
    let http = HttpFallback::new(args.http.clone());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut bridge = Bridge::new(chat, events_tx).with_http(http.clone());
    if args.admin {
        let admin = ChannelDriver::spawn(
            TokioEnv,
            TcpDialer,
            Channel::admin(&args.server),
            config,
            Arc::new(EventBus::new()),
        );
        bridge = bridge.with_admin(admin);
    }
    bridge.subscribe();

    let mut app = App::new(TokioEnv, storage).with_admin(args.admin);
    if let Some(session) = args.session {
        app = app.with_session(session);
    }

    Terminal::new(app, bridge, events_rx, io::stdout())
        .with_http(http)
        .with_color(io::stdout().is_terminal())
        .connect_on_start(!args.offline)
        .run(BufReader::new(tokio::io::stdin()))
        .await?;

    Ok(())
}

//! Terminal client for Tether
//!
//! A line-oriented front end over [`tether_app::App`]: input lines become
//! [`Command`]s, channel events arrive through the [`tether_app::Bridge`],
//! and the [`Renderer`] prints whatever changed.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod error;
pub mod render;
pub mod terminal;

pub use commands::Command;
pub use error::CliError;
pub use render::Renderer;
pub use terminal::Terminal;

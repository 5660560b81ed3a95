//! The interactive chat application.
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the session driving each exchange through the reassembler
//! - [`commands`]: parsing of interactive input lines

mod commands;
mod config;
mod session;

pub use crate::render::{EchoObserver, PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_TIMEOUT};
pub use session::{ChatSession, SessionStats};

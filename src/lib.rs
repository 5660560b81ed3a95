// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod connection;
pub mod error;
pub mod framing;
pub mod history;
pub mod negotiate;
pub mod observability;
pub mod prompt;
pub mod reassemble;
pub mod render;
pub mod tls;
pub mod types;

// Re-exports
pub use client::{Client, ClientOptions};
pub use client_logger::{FrameLogger, TracingFrameLogger};
pub use connection::{Connection, FrameSink, FrameStream};
pub use error::{Error, Result};
pub use history::ConversationHistory;
pub use observability::{TracingEmitter, emit_biometrics, register_biometrics};
pub use prompt::Prompt;
pub use reassemble::{
    CONTINUE_PROMPT, Collected, Completion, ReassemblyObserver, TERMINATOR, TurnChannel,
    send_and_collect,
};
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;

//! Error types for ppxity.
//!
//! This module defines the error type shared by the handshake, the WebSocket
//! transport, the frame codec and the chat session.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

use tokio_tungstenite::tungstenite;

/// The main error type for ppxity.
#[derive(Clone, Debug)]
pub enum Error {
    /// HTTP or WebSocket failure, including handshake mismatches.
    Transport {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The remote end sent a frame of unexpected shape or content.
    Protocol {
        /// Human-readable error message.
        message: String,
        /// The offending frame, if there was one.
        frame: Option<String>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Undo was requested with fewer than two turns in the history.
    InsufficientHistory {
        /// Number of turns present when undo was requested.
        len: usize,
    },

    /// No fragment arrived within the receive window.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The background reader has stopped and nothing more will be delivered.
    ChannelClosed {
        /// Human-readable error message.
        message: String,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Invalid user-supplied configuration.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },
}

impl Error {
    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new protocol error.
    pub fn protocol(message: impl Into<String>, frame: Option<String>) -> Self {
        Error::Protocol {
            message: message.into(),
            frame,
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new insufficient history error.
    pub fn insufficient_history(len: usize) -> Self {
        Error::InsufficientHistory { len }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new channel closed error.
    pub fn channel_closed(message: impl Into<String>) -> Self {
        Error::ChannelClosed {
            message: message.into(),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Returns true if this error is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns true if this error is a protocol error.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }

    /// Returns true if this error is a serialization error.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialization { .. })
    }

    /// Returns true if this error came from undoing a too-short history.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, Error::InsufficientHistory { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if the delivery channel has been closed.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Error::ChannelClosed { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if the error leaves the connection unusable.
    ///
    /// Timeouts and history errors are recoverable; everything else requires
    /// a fresh client.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Timeout { .. } | Error::InsufficientHistory { .. } | Error::Validation { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::Protocol { message, frame } => {
                if let Some(frame) = frame {
                    write!(f, "Protocol error: {message} (frame: {frame})")
                } else {
                    write!(f, "Protocol error: {message}")
                }
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::InsufficientHistory { len } => {
                write!(
                    f,
                    "Insufficient history: need at least 2 turns to backtrack, have {len}"
                )
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::ChannelClosed { message } => {
                write!(f, "Channel closed: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::timeout(format!("HTTP request timed out: {err}"), None)
        } else if err.is_decode() {
            Error::serialization(format!("Failed to decode response: {err}"), Some(Box::new(err)))
        } else {
            Error::transport(format!("HTTP request failed: {err}"), Some(Box::new(err)))
        }
    }
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Error::transport(format!("WebSocket error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for ppxity operations.
pub type Result<T> = std::result::Result<T, Error>;

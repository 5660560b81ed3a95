//! Logging trait for wire-level frames.
//!
//! This module provides the [`FrameLogger`] trait that allows users to capture
//! every frame passing through a [`Connection`](crate::Connection), and
//! [`TracingFrameLogger`], the implementation behind the `--debug` flag.

use std::fmt::Debug;

/// A trait for logging frames exchanged with the Labs service.
///
/// # Example
///
/// ```rust
/// use ppxity::FrameLogger;
/// use std::sync::Mutex;
///
/// #[derive(Debug, Default)]
/// struct Recorder {
///     frames: Mutex<Vec<String>>,
/// }
///
/// impl FrameLogger for Recorder {
///     fn log_sent(&self, frame: &str) {
///         self.frames.lock().unwrap().push(format!("> {frame}"));
///     }
///
///     fn log_received(&self, frame: &str) {
///         self.frames.lock().unwrap().push(format!("< {frame}"));
///     }
/// }
/// ```
pub trait FrameLogger: Debug + Send + Sync {
    /// Log a text frame written to the socket.
    fn log_sent(&self, frame: &str);

    /// Log a text frame read from the socket.
    ///
    /// Called before the frame is decoded, so malformed frames are logged too.
    fn log_received(&self, frame: &str);
}

/// Writes `[SEND]` and `[RECV]` lines at debug level through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFrameLogger;

impl FrameLogger for TracingFrameLogger {
    fn log_sent(&self, frame: &str) {
        tracing::debug!("[SEND] Sending message to perplexity labs: {frame}");
    }

    fn log_received(&self, frame: &str) {
        tracing::debug!("[RECV] Received from perplexity labs: {frame}");
    }
}

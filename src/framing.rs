//! socket.io framing for the Labs event channel.
//!
//! Engine.io packets are text frames whose first character is the packet
//! type. Socket.io events ride inside engine.io `message` packets as
//! `42[<event name>, <payload>]`.

use crate::error::{Error, Result};
use crate::types::{LabsRequest, LabsResponse};

/// Engine.io ping.
pub const PING: &str = "2";

/// Engine.io pong.
pub const PONG: &str = "3";

/// Upgrade probe sent over the new WebSocket.
pub const PROBE: &str = "2probe";

/// Expected answer to [`PROBE`].
pub const PROBE_REPLY: &str = "3probe";

/// Engine.io upgrade packet.
pub const UPGRADE: &str = "5";

/// Expected answer to [`UPGRADE`].
pub const UPGRADE_REPLY: &str = "6";

/// Prefix of a socket.io event inside an engine.io message.
pub const EVENT_PREFIX: &str = "42";

/// Socket.io connect packet carrying the anonymous auth payload.
pub const AUTH_PACKET: &str = r#"40{"jwt":"anonymous-ask-user"}"#;

/// Name of the event the Labs service listens and answers on.
pub const LABS_EVENT: &str = "perplexity_labs";

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Engine.io ping; must be answered with [`PONG`].
    Ping,

    /// A socket.io event.
    Event {
        /// The event name.
        name: String,
        /// The event payload.
        response: LabsResponse,
    },
}

/// Wrap a request as a `perplexity_labs` event frame.
pub fn encode_event(request: &LabsRequest) -> Result<String> {
    let body = serde_json::to_string(&(LABS_EVENT, request)).map_err(|e| {
        Error::serialization(format!("Failed to encode request: {e}"), Some(Box::new(e)))
    })?;
    Ok(format!("{EVENT_PREFIX}{body}"))
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns a protocol error for frames that are neither a ping nor an event,
/// and a serialization error if the event body is not a two-element
/// `[string, object]` array.
pub fn decode_frame(frame: &str) -> Result<InboundFrame> {
    if frame == PING {
        return Ok(InboundFrame::Ping);
    }
    let Some(body) = frame.strip_prefix(EVENT_PREFIX) else {
        return Err(Error::protocol("unexpected message", Some(frame.to_string())));
    };
    let (name, response): (String, LabsResponse) =
        serde_json::from_str(body).map_err(|e| {
            Error::serialization(
                format!("Failed to decode event {body}: {e}"),
                Some(Box::new(e)),
            )
        })?;
    Ok(InboundFrame::Event { name, response })
}

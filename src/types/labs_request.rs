use serde::{Deserialize, Serialize};

use crate::types::{Model, Turn};

/// Protocol version the Labs service expects.
pub const LABS_PROTOCOL_VERSION: &str = "2.5";

/// Request source reported to the service.
pub const LABS_SOURCE: &str = "default";

/// Timezone reported to the service.
pub const LABS_TIMEZONE: &str = "Europe/Athens";

/// The payload of an outbound `perplexity_labs` event.
///
/// Built fresh for every send from a snapshot of the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabsRequest {
    /// Protocol version; always [`LABS_PROTOCOL_VERSION`].
    pub version: String,

    /// Request source; always [`LABS_SOURCE`].
    pub source: String,

    /// Model that should answer.
    pub model: Model,

    /// The full conversation so far, oldest first.
    pub messages: Vec<Turn>,

    /// Client timezone; always [`LABS_TIMEZONE`].
    pub timezone: String,
}

impl LabsRequest {
    /// Create a request for `model` carrying `messages`.
    pub fn new(model: Model, messages: Vec<Turn>) -> Self {
        Self {
            version: LABS_PROTOCOL_VERSION.to_string(),
            source: LABS_SOURCE.to_string(),
            model,
            messages,
            timezone: LABS_TIMEZONE.to_string(),
        }
    }
}

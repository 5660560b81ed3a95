use serde::{Deserialize, Deserializer, Serialize};

/// Status the service reports once an answer is fully produced.
pub const STATUS_COMPLETED: &str = "completed";

/// The payload of an inbound `perplexity_labs` event.
///
/// Every field defaults, whether absent or `null`, so that intermediate
/// frames with a partial shape still decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabsResponse {
    /// The answer text produced so far.
    #[serde(deserialize_with = "null_as_default")]
    pub output: String,

    /// Whether this is the last frame for the request.
    #[serde(rename = "final", deserialize_with = "null_as_default")]
    pub is_final: bool,

    /// Seconds the service spent producing the answer.
    #[serde(deserialize_with = "null_as_default")]
    pub elapsed_time: f64,

    /// Number of tokens streamed so far.
    #[serde(deserialize_with = "null_as_default")]
    pub tokens_streamed: i64,

    /// Request status, e.g. `"completed"`.
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

impl LabsResponse {
    /// Returns true if this frame carries a deliverable answer.
    pub fn is_completed(&self) -> bool {
        self.is_final && self.status == STATUS_COMPLETED
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

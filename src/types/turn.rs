use serde::{Deserialize, Serialize};

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    /// The role of the message.
    pub role: TurnRole,

    /// The text of the message.
    pub content: String,

    /// Reserved by the service; always 0.
    pub priority: i64,
}

/// Role type for a turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl Turn {
    /// Create a new `Turn` with the given content and role.
    pub fn new(content: impl Into<String>, role: TurnRole) -> Self {
        Self {
            role,
            content: content.into(),
            priority: 0,
        }
    }

    /// Create a new user `Turn`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, TurnRole::User)
    }

    /// Create a new assistant `Turn`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, TurnRole::Assistant)
    }
}

impl From<&str> for Turn {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for Turn {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

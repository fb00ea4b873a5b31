use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// One turn of the tutoring conversation. The transcript is an append-only
/// ordered log, cleared wholesale on explicit user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    #[must_use]
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            timestamp,
        }
    }

    #[must_use]
    pub fn model(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            timestamp,
        }
    }
}

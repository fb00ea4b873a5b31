use serde::{Deserialize, Serialize};

/// Premium-only remediation advice for a repeatedly-missed topic.
///
/// Keyed by topic string in the aggregate state; accumulates across quiz
/// sessions and is never removed automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakSpotInsight {
    pub topic: String,
    pub explanation: String,
    pub study_method: String,
}

/// A generated front/back study card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

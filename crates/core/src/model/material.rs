use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::MaterialId;

/// How a unit of study content entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Text,
    Image,
    Voice,
}

impl MaterialKind {
    /// Stable string form used by the hosted table's `type` column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialKind::Text => "text",
            MaterialKind::Image => "image",
            MaterialKind::Voice => "voice",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaterialError {
    #[error("material name must not be empty")]
    EmptyName,

    #[error("material content must not be empty")]
    EmptyContent,
}

/// A unit of user-supplied study content.
///
/// Created unprocessed; mutated exactly once by the distillation result,
/// which attaches the summary and priority topics and flips `processed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMaterial {
    id: MaterialId,
    name: String,
    kind: MaterialKind,
    content: String,
    storage_path: Option<String>,
    /// Time-limited display URL, re-derived on every full reload. Never
    /// persisted since it expires.
    #[serde(skip)]
    signed_url: Option<String>,
    original_transcript: Option<String>,
    summary: Option<String>,
    priority_topics: Vec<String>,
    processed: bool,
    created_at: DateTime<Utc>,
}

impl StudyMaterial {
    /// Create a new, unprocessed material.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError` when the name or content is blank.
    pub fn new(
        id: MaterialId,
        name: impl Into<String>,
        kind: MaterialKind,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MaterialError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MaterialError::EmptyName);
        }
        let content = content.into();
        if content.trim().is_empty() {
            return Err(MaterialError::EmptyContent);
        }

        Ok(Self {
            id,
            name,
            kind,
            content,
            storage_path: None,
            signed_url: None,
            original_transcript: None,
            summary: None,
            priority_topics: Vec::new(),
            processed: false,
            created_at,
        })
    }

    /// Rehydrate a material from persisted storage without re-validating
    /// content (the record was validated on the way in).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: MaterialId,
        name: String,
        kind: MaterialKind,
        content: String,
        storage_path: Option<String>,
        original_transcript: Option<String>,
        summary: Option<String>,
        priority_topics: Vec<String>,
        processed: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            content,
            storage_path,
            signed_url: None,
            original_transcript,
            summary,
            priority_topics,
            processed,
            created_at,
        }
    }

    /// Attach the object-store path this material's raw bytes live under.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Attach the unrefined transcript a voice note was dictated from.
    #[must_use]
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.original_transcript = Some(transcript.into());
        self
    }

    /// Apply the distillation result, marking the material processed.
    pub fn apply_distillation(&mut self, summary: impl Into<String>, topics: Vec<String>) {
        self.summary = Some(summary.into());
        self.priority_topics = topics;
        self.processed = true;
    }

    /// Set or clear the time-limited display URL.
    pub fn set_signed_url(&mut self, url: Option<String>) {
        self.signed_url = url;
    }

    /// Case-insensitive match against name, summary, and priority topics.
    ///
    /// Used to scope rescue-mission quizzes to materials covering a topic.
    #[must_use]
    pub fn matches_topic(&self, topic: &str) -> bool {
        let needle = topic.to_lowercase();
        if needle.is_empty() {
            return false;
        }
        if self.name.to_lowercase().contains(&needle) {
            return true;
        }
        if self
            .summary
            .as_ref()
            .is_some_and(|s| s.to_lowercase().contains(&needle))
        {
            return true;
        }
        self.priority_topics
            .iter()
            .any(|t| t.to_lowercase().contains(&needle))
    }

    #[must_use]
    pub fn id(&self) -> MaterialId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn storage_path(&self) -> Option<&str> {
        self.storage_path.as_deref()
    }

    #[must_use]
    pub fn signed_url(&self) -> Option<&str> {
        self.signed_url.as_deref()
    }

    #[must_use]
    pub fn original_transcript(&self) -> Option<&str> {
        self.original_transcript.as_deref()
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[must_use]
    pub fn priority_topics(&self) -> &[String] {
        &self.priority_topics
    }

    #[must_use]
    pub fn processed(&self) -> bool {
        self.processed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

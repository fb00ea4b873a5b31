//! Shared error types for the services crate.

use thiserror::Error;

use studyunit_core::model::{MaterialError, PlanError};
use studyunit_storage::StorageError;

/// Errors emitted by the AI distillation gateway.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DistillationError {
    #[error("the AI gateway is not configured")]
    Disabled,
    #[error("the AI gateway request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `MaterialService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MaterialServiceError {
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Distillation(#[from] DistillationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService` and `QuizSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no materials are selected for quiz context")]
    NoMaterialsSelected,
    #[error("no materials cover the topic {0:?}")]
    NoMatchingMaterials(String),
    #[error("the generator returned no questions")]
    EmptyQuiz,
    #[error("no question is awaiting an answer")]
    NotAwaitingAnswer,
    #[error("the current question has not been answered yet")]
    NotAnswered,
    #[error("the quiz is still in progress")]
    NotComplete,
    #[error(transparent)]
    Distillation(#[from] DistillationError),
}

/// Errors emitted by `PlanService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanServiceError {
    #[error("no materials are selected to plan from")]
    NoMaterialsSelected,
    #[error("no study plan has been generated")]
    EmptyPlan,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Distillation(#[from] DistillationError),
}

/// Errors emitted by `FlashcardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("no materials are selected to build cards from")]
    NoMaterialsSelected,
    #[error(transparent)]
    Distillation(#[from] DistillationError),
}

/// Errors emitted by `ChatService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatError {
    #[error("chat message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Distillation(#[from] DistillationError),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unauthorized => AuthError::InvalidCredentials,
            other => AuthError::Storage(other),
        }
    }
}

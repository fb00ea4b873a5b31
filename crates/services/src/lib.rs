#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod chat;
pub mod distillation;
pub mod error;
pub mod flashcards;
pub mod gate;
pub mod materials;
pub mod plan;
pub mod quiz;
pub mod sync;

pub use studyunit_core::Clock;

pub use app_services::AppServices;
pub use auth::AuthService;
pub use chat::ChatService;
pub use distillation::{
    ChatContext, Distillation, DistillationService, Distiller, DistillerConfig, VoiceDistillation,
};
pub use error::{
    AuthError, ChatError, DistillationError, FlashcardError, MaterialServiceError,
    PlanServiceError, QuizError,
};
pub use flashcards::FlashcardService;
pub use gate::{Gated, select_difficulty};
pub use materials::{AddOutcome, MaterialService, SIGNED_URL_TTL_SECS};
pub use plan::PlanService;
pub use quiz::{QuizPhase, QuizService, QuizSession};
pub use sync::{DEFAULT_DEBOUNCE, SyncCoordinator, SyncHandle};

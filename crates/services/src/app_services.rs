use std::sync::Arc;
use std::time::Duration;

use studyunit_core::Clock;
use studyunit_core::model::UserId;
use studyunit_storage::{RestConfig, Storage};

use crate::auth::AuthService;
use crate::chat::ChatService;
use crate::distillation::{DistillationService, Distiller};
use crate::flashcards::FlashcardService;
use crate::materials::MaterialService;
use crate::plan::PlanService;
use crate::quiz::QuizService;
use crate::sync::{SyncCoordinator, SyncHandle};

/// Assembles the app-facing services over one storage backend and one AI
/// gateway.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    auth: Arc<AuthService>,
    materials: Arc<MaterialService>,
    quizzes: Arc<QuizService>,
    plans: Arc<PlanService>,
    flashcards: Arc<FlashcardService>,
    chat: Arc<ChatService>,
}

impl AppServices {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage, distiller: Arc<dyn Distiller>) -> Self {
        let auth = Arc::new(AuthService::new(clock, storage.clone()));
        let materials = Arc::new(MaterialService::new(
            clock,
            Arc::clone(&storage.materials),
            Arc::clone(&storage.objects),
            Arc::clone(&distiller),
        ));
        let quizzes = Arc::new(QuizService::new(clock, Arc::clone(&distiller)));
        let plans = Arc::new(PlanService::new(Arc::clone(&distiller)));
        let flashcards = Arc::new(FlashcardService::new(Arc::clone(&distiller)));
        let chat = Arc::new(ChatService::new(clock, distiller));

        Self {
            storage,
            auth,
            materials,
            quizzes,
            plans,
            flashcards,
            chat,
        }
    }

    /// Services talking to the hosted backend, with the AI gateway
    /// configured from the environment.
    #[must_use]
    pub fn hosted(clock: Clock, rest: RestConfig) -> Self {
        let distiller: Arc<dyn Distiller> = Arc::new(DistillationService::from_env(clock));
        Self::new(clock, Storage::rest(rest), distiller)
    }

    /// In-memory services for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock, distiller: Arc<dyn Distiller>) -> Self {
        Self::new(clock, Storage::in_memory(), distiller)
    }

    /// Start the debounced metadata sync for a signed-in user.
    #[must_use]
    pub fn spawn_sync(&self, user: UserId, debounce: Duration) -> SyncHandle {
        SyncCoordinator::spawn(Arc::clone(&self.storage.state), user, debounce)
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn materials(&self) -> Arc<MaterialService> {
        Arc::clone(&self.materials)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn plans(&self) -> Arc<PlanService> {
        Arc::clone(&self.plans)
    }

    #[must_use]
    pub fn flashcards(&self) -> Arc<FlashcardService> {
        Arc::clone(&self.flashcards)
    }

    #[must_use]
    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat)
    }
}

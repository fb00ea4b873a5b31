//! Flashcard generation, locked on the free tier.

use std::sync::Arc;

use studyunit_core::model::AppState;

use crate::distillation::Distiller;
use crate::error::FlashcardError;
use crate::gate::Gated;

pub struct FlashcardService {
    distiller: Arc<dyn Distiller>,
}

impl FlashcardService {
    #[must_use]
    pub fn new(distiller: Arc<dyn Distiller>) -> Self {
        Self { distiller }
    }

    /// Generate a fresh card set from the selected materials, replacing any
    /// existing set. Returns how many cards were generated.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError::NoMaterialsSelected` when nothing is
    /// selected, or a transport error from the gateway.
    pub async fn generate(&self, state: &mut AppState) -> Result<Gated<usize>, FlashcardError> {
        if !state.tier.entitlements().flashcards_unlocked {
            return Ok(Gated::UpgradeRequired);
        }

        let cards = {
            let selected = state.selected_materials();
            if selected.is_empty() {
                return Err(FlashcardError::NoMaterialsSelected);
            }
            self.distiller.generate_flashcards(&selected).await?
        };
        let generated = cards.len();
        state.flashcards = cards;
        Ok(Gated::Allowed(generated))
    }
}

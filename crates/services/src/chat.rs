//! The tutoring chat: an append-only transcript with AI replies grounded in
//! the selected materials.

use std::sync::Arc;

use studyunit_core::Clock;
use studyunit_core::model::{AppState, ChatMessage, QuizDifficulty};

use crate::distillation::{ChatContext, Distiller};
use crate::error::ChatError;

pub struct ChatService {
    clock: Clock,
    distiller: Arc<dyn Distiller>,
}

impl ChatService {
    #[must_use]
    pub fn new(clock: Clock, distiller: Arc<dyn Distiller>) -> Self {
        Self { clock, distiller }
    }

    /// Send one message and append both sides of the exchange to the
    /// transcript. The history handed to the tutor excludes the new message.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` for a blank message, or a transport
    /// error from the gateway. On error the transcript is untouched.
    pub async fn send(
        &self,
        state: &mut AppState,
        user_name: &str,
        difficulty: QuizDifficulty,
        text: &str,
    ) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let reply = {
            let materials = state.selected_materials();
            let context = ChatContext {
                history: &state.chat_history,
                materials: &materials,
                tier: state.tier,
                difficulty,
                user_name,
            };
            self.distiller.tutor_reply(context, text).await?
        };

        let now = self.clock.now();
        state.chat_history.push(ChatMessage::user(text, now));
        state.chat_history.push(ChatMessage::model(reply.clone(), now));
        Ok(reply)
    }

    /// Wipe the transcript. Explicit user action only.
    pub fn clear(&self, state: &mut AppState) {
        state.chat_history.clear();
    }
}

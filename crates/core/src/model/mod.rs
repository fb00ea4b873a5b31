mod chat;
mod ids;
mod insight;
mod material;
mod plan;
mod quiz;
mod state;
mod stats;
mod tier;

pub use chat::{ChatMessage, ChatRole};
pub use ids::{MaterialId, ParseIdError, UserId};
pub use insight::{Flashcard, WeakSpotInsight};
pub use material::{MaterialError, MaterialKind, StudyMaterial};
pub use plan::{PlanError, StudyPlanDay};
pub use quiz::{ParseDifficultyError, PracticeQuestion, QuizDifficulty, QuizProgress};
pub use state::{AppState, StateDocument};
pub use stats::UserStats;
pub use tier::{Entitlements, Tier};

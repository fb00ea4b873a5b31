//! Tier gating helpers.
//!
//! A locked feature is a normal outcome, not an error: the caller routes it
//! to the upgrade path and nothing in the state changes.

use studyunit_core::model::{QuizDifficulty, Tier};

/// Outcome of an action that a subscription tier may lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gated<T> {
    Allowed(T),
    /// The caller's tier does not include this feature; nothing changed.
    UpgradeRequired,
}

impl<T> Gated<T> {
    /// The allowed value, if the gate was open.
    pub fn allowed(self) -> Option<T> {
        match self {
            Gated::Allowed(value) => Some(value),
            Gated::UpgradeRequired => None,
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Gated::UpgradeRequired)
    }
}

/// Apply a difficulty selection. When the tier does not allow the requested
/// difficulty the caller keeps its current one.
#[must_use]
pub fn select_difficulty(tier: Tier, requested: QuizDifficulty) -> Gated<QuizDifficulty> {
    if tier.allows_difficulty(requested) {
        Gated::Allowed(requested)
    } else {
        Gated::UpgradeRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_cannot_select_challenger() {
        assert!(select_difficulty(Tier::Free, QuizDifficulty::Challenger).is_locked());
        assert_eq!(
            select_difficulty(Tier::Free, QuizDifficulty::Standard).allowed(),
            Some(QuizDifficulty::Standard)
        );
    }

    #[test]
    fn expert_opens_at_premium() {
        assert!(select_difficulty(Tier::Pro, QuizDifficulty::Expert).is_locked());
        assert_eq!(
            select_difficulty(Tier::Premium, QuizDifficulty::Expert).allowed(),
            Some(QuizDifficulty::Expert)
        );
    }
}

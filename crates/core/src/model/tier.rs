use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::QuizDifficulty;

/// Subscription level controlling numeric limits and feature unlocks.
///
/// Advisory UI state only; the tier value is client-held and is not a
/// security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Premium,
}

impl Tier {
    /// Pure lookup of the numeric limits and unlocks for this tier.
    #[must_use]
    pub fn entitlements(&self) -> Entitlements {
        match self {
            Tier::Free => Entitlements {
                material_limit: 3,
                max_quiz_length: 10,
                flashcards_unlocked: false,
            },
            Tier::Pro => Entitlements {
                material_limit: 5,
                max_quiz_length: 20,
                flashcards_unlocked: true,
            },
            Tier::Premium => Entitlements {
                material_limit: 10,
                max_quiz_length: 30,
                flashcards_unlocked: true,
            },
        }
    }

    /// Whether this tier may run quizzes at the given difficulty.
    ///
    /// Challenger requires a paid tier; Expert requires Premium.
    #[must_use]
    pub fn allows_difficulty(&self, difficulty: QuizDifficulty) -> bool {
        match difficulty {
            QuizDifficulty::Standard => true,
            QuizDifficulty::Challenger => *self != Tier::Free,
            QuizDifficulty::Expert => *self == Tier::Premium,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Free => "FREE",
            Tier::Pro => "PRO",
            Tier::Premium => "PREMIUM",
        };
        f.write_str(name)
    }
}

/// Capability set derived from a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlements {
    pub material_limit: usize,
    pub max_quiz_length: u32,
    pub flashcards_unlocked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_limits_match_tiers() {
        assert_eq!(Tier::Free.entitlements().material_limit, 3);
        assert_eq!(Tier::Pro.entitlements().material_limit, 5);
        assert_eq!(Tier::Premium.entitlements().material_limit, 10);
    }

    #[test]
    fn quiz_length_caps_match_tiers() {
        assert_eq!(Tier::Free.entitlements().max_quiz_length, 10);
        assert_eq!(Tier::Pro.entitlements().max_quiz_length, 20);
        assert_eq!(Tier::Premium.entitlements().max_quiz_length, 30);
    }

    #[test]
    fn challenger_needs_a_paid_tier() {
        assert!(!Tier::Free.allows_difficulty(QuizDifficulty::Challenger));
        assert!(Tier::Pro.allows_difficulty(QuizDifficulty::Challenger));
        assert!(Tier::Premium.allows_difficulty(QuizDifficulty::Challenger));
    }

    #[test]
    fn expert_needs_premium() {
        assert!(!Tier::Free.allows_difficulty(QuizDifficulty::Expert));
        assert!(!Tier::Pro.allows_difficulty(QuizDifficulty::Expert));
        assert!(Tier::Premium.allows_difficulty(QuizDifficulty::Expert));
    }

    #[test]
    fn standard_is_open_to_everyone() {
        for tier in [Tier::Free, Tier::Pro, Tier::Premium] {
            assert!(tier.allows_difficulty(QuizDifficulty::Standard));
        }
    }

    #[test]
    fn flashcards_are_locked_on_free() {
        assert!(!Tier::Free.entitlements().flashcards_unlocked);
        assert!(Tier::Pro.entitlements().flashcards_unlocked);
        assert!(Tier::Premium.entitlements().flashcards_unlocked);
    }

    #[test]
    fn tier_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Tier::Premium).unwrap(), "\"PREMIUM\"");
        let parsed: Tier = serde_json::from_str("\"FREE\"").unwrap();
        assert_eq!(parsed, Tier::Free);
    }
}

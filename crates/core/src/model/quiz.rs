use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty level a quiz or tutoring exchange is pitched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QuizDifficulty {
    #[default]
    Standard,
    Challenger,
    Expert,
}

impl QuizDifficulty {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizDifficulty::Standard => "Standard",
            QuizDifficulty::Challenger => "Challenger",
            QuizDifficulty::Expert => "Expert",
        }
    }
}

impl fmt::Display for QuizDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDifficultyError;

impl fmt::Display for ParseDifficultyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown quiz difficulty")
    }
}

impl std::error::Error for ParseDifficultyError {}

impl FromStr for QuizDifficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(Self::Standard),
            "Challenger" => Ok(Self::Challenger),
            "Expert" => Ok(Self::Expert),
            _ => Err(ParseDifficultyError),
        }
    }
}

/// A generated multiple-choice question.
///
/// The generator contract guarantees exactly 4 options with `answer` equal to
/// one of them verbatim; that contract is not re-validated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
    pub topic: String,
}

impl PracticeQuestion {
    /// Exact string equality against the answer field.
    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.answer == option
    }
}

/// Resumable snapshot of an in-flight quiz.
///
/// The question sequence is fixed for the session; index, score, and missed
/// topics are mirrored here after every answered question so a user can exit
/// and resume mid-quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizProgress {
    pub questions: Vec<PracticeQuestion>,
    pub current_index: usize,
    pub score: u32,
    /// Duplicates retained intentionally; miss frequency drives the
    /// weak-spot ranking.
    pub missed_topics: Vec<String>,
    pub difficulty: QuizDifficulty,
}

impl QuizProgress {
    /// Start-of-session snapshot for a fresh question sequence.
    #[must_use]
    pub fn start(questions: Vec<PracticeQuestion>, difficulty: QuizDifficulty) -> Self {
        Self {
            questions,
            current_index: 0,
            score: 0,
            missed_topics: Vec::new(),
            difficulty,
        }
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(topic: &str) -> PracticeQuestion {
        PracticeQuestion {
            question: "Which organelle produces ATP?".into(),
            options: vec![
                "Mitochondria".into(),
                "Nucleus".into(),
                "Ribosome".into(),
                "Golgi apparatus".into(),
            ],
            answer: "Mitochondria".into(),
            explanation: "ATP synthesis happens in the mitochondria.".into(),
            topic: topic.into(),
        }
    }

    #[test]
    fn answer_match_is_exact() {
        let q = question("Cells");
        assert!(q.is_correct("Mitochondria"));
        assert!(!q.is_correct("mitochondria"));
        assert!(!q.is_correct("Nucleus"));
    }

    #[test]
    fn difficulty_parses_its_display_form() {
        for d in [
            QuizDifficulty::Standard,
            QuizDifficulty::Challenger,
            QuizDifficulty::Expert,
        ] {
            assert_eq!(d.to_string().parse::<QuizDifficulty>().unwrap(), d);
        }
        assert!("Nightmare".parse::<QuizDifficulty>().is_err());
    }

    #[test]
    fn start_snapshot_is_zeroed() {
        let progress = QuizProgress::start(vec![question("Cells")], QuizDifficulty::Standard);
        assert_eq!(progress.current_index, 0);
        assert_eq!(progress.score, 0);
        assert!(progress.missed_topics.is_empty());
        assert_eq!(progress.total_questions(), 1);
    }
}

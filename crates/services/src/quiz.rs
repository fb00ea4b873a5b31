//! Quiz lifecycle: generation, the answer loop, scoring, analysis, and the
//! resumable mid-quiz snapshot.

use std::sync::Arc;

use studyunit_core::Clock;
use studyunit_core::model::{
    AppState, PracticeQuestion, QuizDifficulty, QuizProgress, StudyMaterial, Tier,
};

use crate::distillation::Distiller;
use crate::error::QuizError;
use crate::gate::Gated;

/// Where a running quiz currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// A question is on screen awaiting an answer.
    Active,
    /// The current question has been answered and feedback is showing.
    Answered { correct: bool },
    /// All questions answered; the score is on screen.
    ScoreSummary,
    /// The missed-topic breakdown is on screen.
    Analysis,
}

/// One in-flight quiz. The question sequence is fixed at start; only the
/// cursor, score, and missed topics move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    questions: Vec<PracticeQuestion>,
    current_index: usize,
    score: u32,
    missed_topics: Vec<String>,
    difficulty: QuizDifficulty,
    phase: QuizPhase,
}

impl QuizSession {
    fn new(questions: Vec<PracticeQuestion>, difficulty: QuizDifficulty) -> Self {
        Self {
            questions,
            current_index: 0,
            score: 0,
            missed_topics: Vec::new(),
            difficulty,
            phase: QuizPhase::Active,
        }
    }

    /// Rebuild a session from a persisted snapshot, resuming at the first
    /// unanswered question.
    #[must_use]
    pub fn from_progress(progress: QuizProgress) -> Self {
        let phase = if progress.current_index >= progress.questions.len() {
            QuizPhase::ScoreSummary
        } else {
            QuizPhase::Active
        };
        Self {
            current_index: progress.current_index,
            score: progress.score,
            missed_topics: progress.missed_topics,
            difficulty: progress.difficulty,
            questions: progress.questions,
            phase,
        }
    }

    /// Answer the question on screen. Wrong answers record the question's
    /// topic as missed; duplicates are kept since frequency matters.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotAwaitingAnswer` outside the active phase.
    pub fn choose(&mut self, option: &str) -> Result<bool, QuizError> {
        if self.phase != QuizPhase::Active {
            return Err(QuizError::NotAwaitingAnswer);
        }
        let Some(question) = self.questions.get(self.current_index) else {
            return Err(QuizError::NotAwaitingAnswer);
        };

        let correct = question.is_correct(option);
        if correct {
            self.score += 1;
        } else {
            self.missed_topics.push(question.topic.clone());
        }
        self.phase = QuizPhase::Answered { correct };
        Ok(correct)
    }

    /// Move past the feedback screen to the next question or the summary.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotAnswered` when no feedback is showing.
    pub fn advance(&mut self) -> Result<QuizPhase, QuizError> {
        let QuizPhase::Answered { .. } = self.phase else {
            return Err(QuizError::NotAnswered);
        };
        self.current_index += 1;
        self.phase = if self.current_index >= self.questions.len() {
            QuizPhase::ScoreSummary
        } else {
            QuizPhase::Active
        };
        Ok(self.phase)
    }

    /// Move from the score summary into the missed-topic breakdown.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotComplete` unless the score summary is showing.
    pub fn reveal_analysis(&mut self) -> Result<Vec<(String, u32)>, QuizError> {
        if self.phase != QuizPhase::ScoreSummary {
            return Err(QuizError::NotComplete);
        }
        self.phase = QuizPhase::Analysis;
        Ok(self.missed_breakdown())
    }

    /// Unique missed topics with miss counts, in first-missed order.
    #[must_use]
    pub fn missed_breakdown(&self) -> Vec<(String, u32)> {
        let mut breakdown: Vec<(String, u32)> = Vec::new();
        for topic in &self.missed_topics {
            if let Some(entry) = breakdown.iter_mut().find(|(name, _)| name == topic) {
                entry.1 += 1;
            } else {
                breakdown.push((topic.clone(), 1));
            }
        }
        breakdown
    }

    /// Snapshot for mid-quiz persistence. The index always points at the
    /// next unanswered question so a resume never re-scores.
    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let current_index = match self.phase {
            QuizPhase::Active => self.current_index,
            QuizPhase::Answered { .. } => self.current_index + 1,
            QuizPhase::ScoreSummary | QuizPhase::Analysis => self.questions.len(),
        };
        QuizProgress {
            questions: self.questions.clone(),
            current_index,
            score: self.score,
            missed_topics: self.missed_topics.clone(),
            difficulty: self.difficulty,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&PracticeQuestion> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn missed_topics(&self) -> &[String] {
        &self.missed_topics
    }

    #[must_use]
    pub fn difficulty(&self) -> QuizDifficulty {
        self.difficulty
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.phase, QuizPhase::ScoreSummary | QuizPhase::Analysis)
    }
}

pub struct QuizService {
    clock: Clock,
    distiller: Arc<dyn Distiller>,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, distiller: Arc<dyn Distiller>) -> Self {
        Self { clock, distiller }
    }

    /// Start a quiz over the currently selected materials. The requested
    /// length is clamped to the tier's cap.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoMaterialsSelected` when nothing is selected,
    /// `QuizError::EmptyQuiz` when generation produced no questions, or a
    /// transport error from the gateway.
    pub async fn start(
        &self,
        state: &mut AppState,
        length: u32,
        difficulty: QuizDifficulty,
    ) -> Result<Gated<QuizSession>, QuizError> {
        if !state.tier.allows_difficulty(difficulty) {
            return Ok(Gated::UpgradeRequired);
        }
        let length = length.clamp(1, state.tier.entitlements().max_quiz_length);

        let questions = {
            let selected = state.selected_materials();
            if selected.is_empty() {
                return Err(QuizError::NoMaterialsSelected);
            }
            self.distiller
                .generate_quiz(&selected, length, difficulty)
                .await?
        };
        self.install(state, questions, difficulty)
    }

    /// Start a focused quiz over every material touching a weak topic,
    /// regardless of the current selection.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoMatchingMaterials` when no material covers the
    /// topic, plus everything `start` can return.
    pub async fn start_rescue(
        &self,
        state: &mut AppState,
        topic: &str,
        length: u32,
        difficulty: QuizDifficulty,
    ) -> Result<Gated<QuizSession>, QuizError> {
        if !state.tier.allows_difficulty(difficulty) {
            return Ok(Gated::UpgradeRequired);
        }
        let length = length.clamp(1, state.tier.entitlements().max_quiz_length);

        let questions = {
            let matching: Vec<&StudyMaterial> = state
                .materials
                .iter()
                .filter(|material| material.matches_topic(topic))
                .collect();
            if matching.is_empty() {
                return Err(QuizError::NoMatchingMaterials(topic.to_owned()));
            }
            self.distiller
                .generate_quiz(&matching, length, difficulty)
                .await?
        };
        self.install(state, questions, difficulty)
    }

    /// Rebuild the session a user exited mid-quiz, if one was saved.
    #[must_use]
    pub fn resume(&self, state: &AppState) -> Option<QuizSession> {
        state.current_quiz.clone().map(QuizSession::from_progress)
    }

    /// Answer the current question and mirror the snapshot for resume.
    ///
    /// # Errors
    ///
    /// Propagates `QuizSession::choose` errors.
    pub fn answer(
        &self,
        state: &mut AppState,
        session: &mut QuizSession,
        option: &str,
    ) -> Result<bool, QuizError> {
        let correct = session.choose(option)?;
        state.current_quiz = Some(session.progress());
        Ok(correct)
    }

    /// Advance past feedback and mirror the snapshot for resume.
    ///
    /// # Errors
    ///
    /// Propagates `QuizSession::advance` errors.
    pub fn advance(
        &self,
        state: &mut AppState,
        session: &mut QuizSession,
    ) -> Result<QuizPhase, QuizError> {
        let phase = session.advance()?;
        state.current_quiz = Some(session.progress());
        Ok(phase)
    }

    /// Reveal the missed-topic breakdown. Premium users also get remediation
    /// insights fetched; an insight failure never blocks the analysis.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotComplete` unless the score summary is showing.
    pub async fn analyze(
        &self,
        state: &mut AppState,
        session: &mut QuizSession,
    ) -> Result<Vec<(String, u32)>, QuizError> {
        let breakdown = session.reveal_analysis()?;

        if state.tier == Tier::Premium && !breakdown.is_empty() {
            let topics: Vec<String> = breakdown.iter().map(|(name, _)| name.clone()).collect();
            let fetched = {
                let selected = state.selected_materials();
                self.distiller.weak_spot_insights(&topics, &selected).await
            };
            match fetched {
                Ok(insights) => {
                    for insight in insights {
                        state.weak_spot_insights.insert(insight.topic.clone(), insight);
                    }
                }
                Err(err) => tracing::warn!(%err, "weak spot insight fetch failed"),
            }
        }
        Ok(breakdown)
    }

    /// Bank a finished quiz into lifetime stats, fold its misses into the
    /// weak-spot counts, and clear the resumable snapshot.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotComplete` while questions remain.
    pub fn complete(&self, state: &mut AppState, session: &QuizSession) -> Result<(), QuizError> {
        if !session.is_complete() {
            return Err(QuizError::NotComplete);
        }
        state.stats = state.stats.record_session(self.clock.today(), session.score());
        state.record_missed_topics(session.missed_topics().iter().map(String::as_str));
        state.current_quiz = None;
        Ok(())
    }

    fn install(
        &self,
        state: &mut AppState,
        questions: Vec<PracticeQuestion>,
        difficulty: QuizDifficulty,
    ) -> Result<Gated<QuizSession>, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuiz);
        }
        let session = QuizSession::new(questions, difficulty);
        state.current_quiz = Some(session.progress());
        Ok(Gated::Allowed(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(topic: &str, answer: &str) -> PracticeQuestion {
        PracticeQuestion {
            question: format!("About {topic}?"),
            options: vec![answer.into(), "b".into(), "c".into(), "d".into()],
            answer: answer.into(),
            explanation: "because".into(),
            topic: topic.into(),
        }
    }

    fn session(topics: &[&str]) -> QuizSession {
        QuizSession::new(
            topics.iter().map(|t| question(t, "right")).collect(),
            QuizDifficulty::Standard,
        )
    }

    #[test]
    fn answer_loop_walks_every_phase() {
        let mut quiz = session(&["Cells", "Mitosis"]);
        assert_eq!(quiz.phase(), QuizPhase::Active);

        assert!(quiz.choose("right").unwrap());
        assert_eq!(quiz.phase(), QuizPhase::Answered { correct: true });
        assert_eq!(quiz.advance().unwrap(), QuizPhase::Active);

        assert!(!quiz.choose("wrong").unwrap());
        assert_eq!(quiz.advance().unwrap(), QuizPhase::ScoreSummary);
        assert!(quiz.is_complete());

        let breakdown = quiz.reveal_analysis().unwrap();
        assert_eq!(breakdown, vec![("Mitosis".to_owned(), 1)]);
        assert_eq!(quiz.phase(), QuizPhase::Analysis);
        assert_eq!(quiz.score(), 1);
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut quiz = session(&["Cells"]);
        assert!(matches!(quiz.advance(), Err(QuizError::NotAnswered)));
        assert!(matches!(
            quiz.reveal_analysis(),
            Err(QuizError::NotComplete)
        ));

        quiz.choose("right").unwrap();
        assert!(matches!(
            quiz.choose("right"),
            Err(QuizError::NotAwaitingAnswer)
        ));
    }

    #[test]
    fn snapshot_points_at_the_next_unanswered_question() {
        let mut quiz = session(&["Cells", "Mitosis"]);
        quiz.choose("wrong").unwrap();

        // Mid-feedback snapshot: the answered question must not be re-asked.
        let progress = quiz.progress();
        assert_eq!(progress.current_index, 1);
        assert_eq!(progress.missed_topics, vec!["Cells".to_owned()]);

        let resumed = QuizSession::from_progress(progress);
        assert_eq!(resumed.phase(), QuizPhase::Active);
        assert_eq!(resumed.current_question().unwrap().topic, "Mitosis");
    }

    #[test]
    fn finished_snapshot_resumes_at_the_summary() {
        let mut quiz = session(&["Cells"]);
        quiz.choose("right").unwrap();
        quiz.advance().unwrap();

        let resumed = QuizSession::from_progress(quiz.progress());
        assert_eq!(resumed.phase(), QuizPhase::ScoreSummary);
        assert!(resumed.is_complete());
    }

    #[test]
    fn missed_breakdown_counts_repeats_in_order() {
        let mut quiz = session(&["Cells", "Mitosis", "Cells"]);
        for _ in 0..3 {
            quiz.choose("wrong").unwrap();
            quiz.advance().unwrap();
        }
        assert_eq!(
            quiz.missed_breakdown(),
            vec![("Cells".to_owned(), 2), ("Mitosis".to_owned(), 1)]
        );
    }
}

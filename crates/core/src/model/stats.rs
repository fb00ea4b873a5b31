use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Lifetime and daily study counters, updated once per completed quiz.
///
/// Invariant: `longest_streak >= current_streak`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub sessions_completed: u32,
    pub total_time_minutes: u32,
    pub questions_answered: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
    pub questions_today: u32,
    pub daily_goal: u32,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            sessions_completed: 0,
            total_time_minutes: 0,
            questions_answered: 0,
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
            questions_today: 0,
            daily_goal: 20,
        }
    }
}

impl UserStats {
    /// Fold one completed quiz session into the stats.
    ///
    /// Streak rule, evaluated against the stored `last_study_date`:
    /// - same day: streak unchanged, score adds to `questions_today`;
    /// - exactly yesterday: streak extends by one, `questions_today` resets
    ///   to this session's score;
    /// - gap or first-ever session: streak resets to 1, `questions_today`
    ///   resets to this session's score.
    ///
    /// Session and lifetime question counters increment unconditionally.
    /// Evaluated once per completed quiz, never retroactively.
    #[must_use]
    pub fn record_session(&self, today: NaiveDate, score: u32) -> Self {
        let same_day = self.last_study_date == Some(today);
        let (current_streak, questions_today) = if same_day {
            (self.current_streak, self.questions_today + score)
        } else if self.last_study_date == today.checked_sub_days(Days::new(1)) {
            (self.current_streak + 1, score)
        } else {
            (1, score)
        };

        Self {
            sessions_completed: self.sessions_completed + 1,
            total_time_minutes: self.total_time_minutes,
            questions_answered: self.questions_answered + score,
            current_streak,
            longest_streak: self.longest_streak.max(current_streak),
            last_study_date: Some(today),
            questions_today,
            daily_goal: self.daily_goal,
        }
    }

    /// Fraction of today's goal reached, clamped to 1.0.
    #[must_use]
    pub fn daily_progress(&self) -> f64 {
        if self.daily_goal == 0 {
            return 1.0;
        }
        (f64::from(self.questions_today) / f64::from(self.daily_goal)).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_session_starts_a_streak() {
        let stats = UserStats::default().record_session(date(2024, 1, 10), 5);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
        assert_eq!(stats.questions_today, 5);
        assert_eq!(stats.sessions_completed, 1);
        assert_eq!(stats.questions_answered, 5);
        assert_eq!(stats.last_study_date, Some(date(2024, 1, 10)));
    }

    #[test]
    fn same_day_session_leaves_streak_and_accumulates() {
        let stats = UserStats::default()
            .record_session(date(2024, 1, 10), 5)
            .record_session(date(2024, 1, 10), 3);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.questions_today, 8);
        assert_eq!(stats.sessions_completed, 2);
        assert_eq!(stats.questions_answered, 8);
    }

    #[test]
    fn consecutive_day_extends_streak_and_resets_today() {
        let stats = UserStats {
            current_streak: 4,
            longest_streak: 4,
            last_study_date: Some(date(2024, 1, 10)),
            questions_today: 12,
            ..UserStats::default()
        };

        let updated = stats.record_session(date(2024, 1, 11), 5);
        assert_eq!(updated.current_streak, 5);
        assert!(updated.longest_streak >= 5);
        assert_eq!(updated.questions_today, 5);
    }

    #[test]
    fn gap_resets_streak_to_one() {
        let stats = UserStats {
            current_streak: 4,
            longest_streak: 9,
            last_study_date: Some(date(2024, 1, 10)),
            ..UserStats::default()
        };

        let updated = stats.record_session(date(2024, 1, 13), 2);
        assert_eq!(updated.current_streak, 1);
        assert_eq!(updated.longest_streak, 9);
        assert_eq!(updated.questions_today, 2);
    }

    #[test]
    fn longest_streak_never_decreases() {
        let mut stats = UserStats::default();
        let days = [
            date(2024, 1, 1),
            date(2024, 1, 2),
            date(2024, 1, 3),
            date(2024, 1, 7),
            date(2024, 1, 8),
        ];
        let mut prev_longest = 0;
        for day in days {
            stats = stats.record_session(day, 1);
            assert!(stats.longest_streak >= prev_longest);
            assert!(stats.longest_streak >= stats.current_streak);
            prev_longest = stats.longest_streak;
        }
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn daily_progress_clamps_at_goal() {
        let stats = UserStats {
            questions_today: 30,
            daily_goal: 20,
            ..UserStats::default()
        };
        assert!((stats.daily_progress() - 1.0).abs() < f64::EPSILON);
    }
}

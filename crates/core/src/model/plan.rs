use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("task status length {status} does not match task count {tasks}")]
    StatusLengthMismatch { tasks: usize, status: usize },

    #[error("task index {index} out of range for {tasks} tasks")]
    TaskOutOfRange { index: usize, tasks: usize },
}

/// One day of a generated study roadmap.
///
/// Invariant: `task_status` always has one flag per task, and `completed` is
/// true exactly when every flag is set. The generator only supplies
/// date/tasks/duration; status flags are seeded false on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlanDay {
    date: NaiveDate,
    tasks: Vec<String>,
    task_status: Vec<bool>,
    duration_minutes: u32,
    completed: bool,
}

impl StudyPlanDay {
    /// Build a day from freshly generated tasks, all marked not-done.
    #[must_use]
    pub fn from_generated(date: NaiveDate, tasks: Vec<String>, duration_minutes: u32) -> Self {
        let task_status = vec![false; tasks.len()];
        Self {
            date,
            tasks,
            task_status,
            duration_minutes,
            completed: false,
        }
    }

    /// Rehydrate a day from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::StatusLengthMismatch` when the parallel arrays
    /// have drifted apart.
    pub fn from_persisted(
        date: NaiveDate,
        tasks: Vec<String>,
        task_status: Vec<bool>,
        duration_minutes: u32,
    ) -> Result<Self, PlanError> {
        if tasks.len() != task_status.len() {
            return Err(PlanError::StatusLengthMismatch {
                tasks: tasks.len(),
                status: task_status.len(),
            });
        }
        let completed = !task_status.is_empty() && task_status.iter().all(|done| *done);
        Ok(Self {
            date,
            tasks,
            task_status,
            duration_minutes,
            completed,
        })
    }

    /// Mark a single task done; derives the day's `completed` flag.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::TaskOutOfRange` for an invalid index.
    pub fn mark_task_done(&mut self, task_index: usize) -> Result<(), PlanError> {
        let Some(flag) = self.task_status.get_mut(task_index) else {
            return Err(PlanError::TaskOutOfRange {
                index: task_index,
                tasks: self.tasks.len(),
            });
        };
        *flag = true;
        if self.task_status.iter().all(|done| *done) {
            self.completed = true;
        }
        Ok(())
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    #[must_use]
    pub fn task_status(&self) -> &[bool] {
        &self.task_status
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(tasks: &[&str]) -> StudyPlanDay {
        StudyPlanDay::from_generated(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            tasks.iter().map(ToString::to_string).collect(),
            45,
        )
    }

    #[test]
    fn generated_day_seeds_all_false() {
        let plan = day(&["Review cells", "Practice quiz"]);
        assert_eq!(plan.task_status(), &[false, false]);
        assert!(!plan.completed());
        assert_eq!(plan.tasks().len(), plan.task_status().len());
    }

    #[test]
    fn completing_every_task_completes_the_day() {
        let mut plan = day(&["a", "b", "c"]);
        plan.mark_task_done(0).unwrap();
        plan.mark_task_done(2).unwrap();
        assert!(!plan.completed());
        plan.mark_task_done(1).unwrap();
        assert!(plan.completed());
        assert_eq!(plan.tasks().len(), plan.task_status().len());
    }

    #[test]
    fn out_of_range_task_is_rejected() {
        let mut plan = day(&["only"]);
        let err = plan.mark_task_done(3).unwrap_err();
        assert_eq!(err, PlanError::TaskOutOfRange { index: 3, tasks: 1 });
    }

    #[test]
    fn persisted_day_requires_matching_lengths() {
        let err = StudyPlanDay::from_persisted(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            vec!["a".into(), "b".into()],
            vec![true],
            30,
        )
        .unwrap_err();
        assert_eq!(err, PlanError::StatusLengthMismatch { tasks: 2, status: 1 });
    }

    #[test]
    fn persisted_day_derives_completed() {
        let plan = StudyPlanDay::from_persisted(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            vec!["a".into(), "b".into()],
            vec![true, true],
            30,
        )
        .unwrap();
        assert!(plan.completed());
    }
}

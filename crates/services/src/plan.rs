//! Study plan generation and day-by-day task tracking.

use std::sync::Arc;

use studyunit_core::model::AppState;

use crate::distillation::Distiller;
use crate::error::PlanServiceError;

pub struct PlanService {
    distiller: Arc<dyn Distiller>,
}

impl PlanService {
    #[must_use]
    pub fn new(distiller: Arc<dyn Distiller>) -> Self {
        Self { distiller }
    }

    /// Generate a fresh roadmap from the selected materials, replacing any
    /// existing plan along with its task progress.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::NoMaterialsSelected` when nothing is
    /// selected, or a transport error from the gateway.
    pub async fn generate(&self, state: &mut AppState) -> Result<usize, PlanServiceError> {
        let days = {
            let selected = state.selected_materials();
            if selected.is_empty() {
                return Err(PlanServiceError::NoMaterialsSelected);
            }
            self.distiller
                .generate_study_plan(&selected, state.exam_date, state.daily_time_minutes)
                .await?
        };
        let generated = days.len();
        state.plan = days;
        Ok(generated)
    }

    /// Check off one task on today's plan day (the first day of the plan).
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::EmptyPlan` when no plan exists, or a
    /// `PlanError` for an invalid task index.
    pub fn mark_task_done(
        &self,
        state: &mut AppState,
        task_index: usize,
    ) -> Result<(), PlanServiceError> {
        let Some(day) = state.plan.first_mut() else {
            return Err(PlanServiceError::EmptyPlan);
        };
        day.mark_task_done(task_index)?;
        Ok(())
    }
}

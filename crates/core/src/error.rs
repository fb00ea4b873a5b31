use thiserror::Error;

use crate::model::{MaterialError, PlanError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

use thiserror::Error;

use super::month::Month;
use crate::remote::ServiceError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("failed to fetch schedules for {month}: {source}")]
    Fetch { month: Month, source: ServiceError },

    #[error("failed to save schedule: {0}")]
    Save(ServiceError),

    #[error("failed to delete schedule: {0}")]
    Delete(ServiceError),

    #[error("schedule has not been saved yet")]
    Unsaved,

    #[error("not logged in")]
    NotLoggedIn,
}

impl ScheduleError {
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            ScheduleError::Fetch { source, .. } => Some(source),
            ScheduleError::Save(e) | ScheduleError::Delete(e) => Some(e),
            ScheduleError::Unsaved | ScheduleError::NotLoggedIn => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.service_error().is_some_and(ServiceError::is_retryable)
    }

    pub fn is_not_found(&self) -> bool {
        self.service_error().is_some_and(ServiceError::is_not_found)
    }
}

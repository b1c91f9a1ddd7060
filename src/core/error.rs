//! Service error type

use crate::core::mailing::MailingError;
use crate::core::schedule::ScheduleError;
use crate::core::statistics::WindowError;
use crate::infrastructure::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ScheduleError> for ServiceError {
    fn from(e: ScheduleError) -> Self {
        ServiceError::Invalid(e.to_string())
    }
}

impl From<MailingError> for ServiceError {
    fn from(e: MailingError) -> Self {
        ServiceError::Invalid(e.to_string())
    }
}

impl From<WindowError> for ServiceError {
    fn from(e: WindowError) -> Self {
        ServiceError::Invalid(e.to_string())
    }
}

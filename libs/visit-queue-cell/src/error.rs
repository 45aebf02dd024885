use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue entry not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Patient is already in queue")]
    AlreadyQueued,

    #[error("Could not assign a queue number after {attempts} attempts")]
    NumberingContention { attempts: u32 },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<QueueError> for AppError {
    fn from(error: QueueError) -> Self {
        let message = error.to_string();
        match error {
            QueueError::NotFound => AppError::NotFound(message),
            QueueError::PatientNotFound
            | QueueError::AppointmentNotFound
            | QueueError::AlreadyQueued => AppError::BadRequest(message),
            QueueError::NumberingContention { .. } => AppError::Internal(message),
            QueueError::Database(e) => e.into(),
        }
    }
}

// libs/appointment-cell/src/error.rs
use thiserror::Error;

use shared_database::DbError;
use shared_models::error::AppError;

use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid date/time format")]
    InvalidDateTime,

    #[error("Cannot book appointments in the past")]
    PastDate,

    #[error("Doctor not found or inactive")]
    DoctorUnavailable,

    #[error("This time slot is not available")]
    SlotNotAvailable,

    /// Pre-check found a booked appointment in the slot.
    #[error("This time slot is already booked")]
    SlotTaken,

    /// The store's unique index rejected a concurrent booking.
    #[error("This time slot is already booked")]
    SlotConflict,

    #[error("Can only cancel booked appointments")]
    NotCancellable,

    #[error("Cannot complete an appointment that is {0}")]
    NotCompletable(AppointmentStatus),

    #[error("Can only update history for completed appointments")]
    HistoryNotEditable,

    #[error("Treatment record not found")]
    TreatmentNotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::DoctorUnavailable
            | AppointmentError::TreatmentNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::SlotConflict => AppError::Conflict(err.to_string()),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Store(db) => db.into(),
            AppointmentError::InvalidDateTime
            | AppointmentError::PastDate
            | AppointmentError::SlotNotAvailable
            | AppointmentError::SlotTaken
            | AppointmentError::NotCancellable
            | AppointmentError::NotCompletable(_)
            | AppointmentError::HistoryNotEditable => AppError::BadRequest(err.to_string()),
        }
    }
}

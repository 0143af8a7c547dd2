use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Background jobs are not available. Please ensure Redis is running.")]
    Unavailable,

    #[error("Export task not found")]
    JobNotFound(Uuid),

    #[error("Invalid export state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Redis connection error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV generation failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to load history: {0}")]
    History(#[from] AppointmentError),
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Unavailable => AppError::ServiceUnavailable(err.to_string()),
            ExportError::JobNotFound(_) => AppError::NotFound(err.to_string()),
            ExportError::History(inner) => inner.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn maps_to_http_errors() {
        assert_matches!(AppError::from(ExportError::Unavailable), AppError::ServiceUnavailable(_));
        assert_matches!(AppError::from(ExportError::JobNotFound(Uuid::nil())), AppError::NotFound(m) if m == "Export task not found");
        assert_matches!(AppError::from(ExportError::Pool("down".into())), AppError::Internal(_));
    }
}

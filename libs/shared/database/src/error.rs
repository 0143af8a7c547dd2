use serde::Deserialize;
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Error payload returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
pub struct PostgrestError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
}

impl DbError {
    /// Classifies a non-success response from the store.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .clone()
            .unwrap_or_else(|| body.to_string());

        match (status, parsed.code.as_deref()) {
            (_, Some("23505")) => DbError::Conflict(message),
            (_, Some("23503")) | (_, Some("23502")) | (_, Some("23514")) => {
                DbError::Constraint(message)
            }
            (409, _) => DbError::Conflict(message),
            (401, _) | (403, _) => DbError::Auth(message),
            (404, _) => DbError::NotFound(message),
            _ => DbError::Api { status, message },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => AppError::Conflict(msg),
            DbError::Constraint(msg) => AppError::BadRequest(msg),
            DbError::NotFound(msg) => AppError::NotFound(msg),
            DbError::Auth(msg) => AppError::Internal(format!("Store rejected credentials: {}", msg)),
            DbError::Api { status, message } => {
                AppError::Database(format!("Store error ({}): {}", status, message))
            }
            DbError::Transport(e) => AppError::ExternalService(e.to_string()),
            DbError::Decode(e) => AppError::Internal(format!("Unexpected store payload: {}", e)),
            DbError::InvalidHeader(msg) => AppError::Internal(msg),
        }
    }
}

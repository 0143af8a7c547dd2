use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use patient_cell::models::RegisterPatientRequest;
use patient_cell::PatientService;
use shared_cache::keys;
use shared_models::error::AppError;
use shared_utils::jwt::validate_token;
use shared_utils::AppState;

use crate::models::{LoginRequest, LoginResponse};
use crate::services::session::SessionService;

/// Patient self-registration.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient = PatientService::new(state.db.clone()).register(request).await?;

    state.cache.clear_pattern(keys::ADMIN_PATIENTS_PATTERN).await;
    state.cache.delete(keys::ADMIN_DASHBOARD).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "user": patient
        })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let username = request.username.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let password = request.password.as_deref().filter(|v| !v.is_empty());

    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::BadRequest("Username and password are required".to_string()));
    };

    let response = SessionService::new(state.config.clone(), state.db.clone())
        .login(username, password)
        .await?;

    Ok(Json(response))
}

/// Role-specific profile of the bearer.
pub async fn me(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<Value>, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let user = validate_token(bearer.token(), &state.config.jwt_secret).map_err(AppError::Auth)?;
    debug!("Profile lookup for {}", user.id);

    let profile = SessionService::new(state.config.clone(), state.db.clone())
        .profile(user.id)
        .await?;

    Ok(Json(profile))
}

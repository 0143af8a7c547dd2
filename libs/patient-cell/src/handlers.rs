// libs/patient-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentFilter, BookAppointmentRequest, ListScope};
use appointment_cell::services::availability::AvailabilityService;
use appointment_cell::services::booking::BookingService;
use appointment_cell::services::history::HistoryService;
use appointment_cell::services::lifecycle::LifecycleService;
use department_cell::services::department::DepartmentService;
use doctor_cell::models::{Doctor, DoctorSearchQuery};
use doctor_cell::DoctorService;
use shared_cache::{keys, DEFAULT_TTL_SECS};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::Path;
use shared_utils::AppState;

use crate::models::UpdatePatientRequest;
use crate::services::PatientService;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ==============================================================================
// DASHBOARD & PROFILE
// ==============================================================================

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(state.db.clone()).require(user.id).await?;
    let upcoming = HistoryService::new(state.db.clone())
        .upcoming_for_patient(patient.id, today())
        .await?;
    let departments = DepartmentService::new(state.db.clone()).list().await?;

    Ok(Json(json!({
        "patient": patient,
        "upcoming_appointments": upcoming,
        "departments": departments
    })))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(state.db.clone()).require(user.id).await?;
    Ok(Json(json!(patient)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(state.db.clone()).update(user.id, request).await?;

    state.cache.clear_pattern(keys::ADMIN_PATIENTS_PATTERN).await;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "patient": patient
    })))
}

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

pub async fn department_doctors(
    State(state): State<Arc<AppState>>,
    Path(department_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if DepartmentService::new(state.db.clone()).get(department_id).await?.is_none() {
        return Err(AppError::NotFound("Department not found".to_string()));
    }

    let doctors = DoctorService::new(state.db.clone()).by_department(department_id).await?;
    Ok(Json(json!(doctors)))
}

/// Active doctors by name, username or department. Results are cached per query.
pub async fn search_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search query is required".to_string()))?;

    let cache_key = keys::doctor_search(search);
    if let Some(cached) = state.cache.get::<Vec<Doctor>>(&cache_key).await {
        debug!("Doctor search served from cache: {}", cache_key);
        return Ok(Json(json!(cached)));
    }

    let doctors = DoctorService::new(state.db.clone()).search_active(search).await?;
    state.cache.set(&cache_key, &doctors, DEFAULT_TTL_SECS).await;

    Ok(Json(json!(doctors)))
}

pub async fn doctor_details(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(state.db.clone()).require(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

/// Open slots of the next seven days.
pub async fn doctor_availability(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    DoctorService::new(state.db.clone()).require(doctor_id).await?;

    let slots = AvailabilityService::new(state.db.clone())
        .open_slots(doctor_id, today())
        .await?;

    Ok(Json(json!(slots)))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let appointments = HistoryService::new(state.db.clone())
        .list(ListScope::Patient(user.id), &filter, today())
        .await?;

    Ok(Json(json!(appointments)))
}

pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient = PatientService::new(state.db.clone()).require(user.id).await?;

    let appointment = BookingService::new(state.db.clone())
        .book(patient.id, request, today())
        .await?;

    state.cache.invalidate_appointments(&patient.id.to_string()).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked successfully",
            "appointment": appointment
        })),
    ))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = LifecycleService::new(state.db.clone())
        .cancel_by_patient(user.id, appointment_id)
        .await?;

    state.cache.invalidate_appointments(&appointment.patient_id.to_string()).await;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment": appointment
    })))
}

/// Completed visits with treatments, newest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(state.db.clone()).require(user.id).await?;

    let cache_key = keys::patient_history(&patient.id.to_string());
    if let Some(cached) = state.cache.get::<Vec<Appointment>>(&cache_key).await {
        return Ok(Json(json!(cached)));
    }

    let visits = HistoryService::new(state.db.clone())
        .completed_history(patient.id, None)
        .await?;
    state.cache.set(&cache_key, &visits, DEFAULT_TTL_SECS).await;

    Ok(Json(json!(visits)))
}

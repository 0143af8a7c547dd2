// libs/admin-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentFilter, ListScope};
use appointment_cell::services::history::HistoryService;
use appointment_cell::services::lifecycle::LifecycleService;
use doctor_cell::models::{CreateDoctorRequest, Doctor, UpdateDoctorRequest};
use doctor_cell::DoctorService;
use patient_cell::models::{Patient, UpdatePatientRequest};
use patient_cell::PatientService;
use shared_cache::{keys, DEFAULT_TTL_SECS};
use shared_models::error::AppError;
use shared_utils::extractor::Path;
use shared_utils::AppState;

use crate::models::{DashboardStats, DirectoryQuery};
use crate::services::DashboardService;

// ==============================================================================
// DASHBOARD
// ==============================================================================

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Json<DashboardStats>, AppError> {
    if let Some(stats) = state.cache.get::<DashboardStats>(keys::ADMIN_DASHBOARD).await {
        return Ok(Json(stats));
    }

    let stats = DashboardService::new(state.db.clone())
        .stats(Local::now().date_naive())
        .await?;
    state.cache.set(keys::ADMIN_DASHBOARD, &stats, DEFAULT_TTL_SECS).await;

    Ok(Json(stats))
}

// ==============================================================================
// DOCTORS
// ==============================================================================

pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let cache_key = keys::admin_doctors(query.term());
    if let Some(cached) = state.cache.get::<Vec<Doctor>>(&cache_key).await {
        debug!("Doctor directory served from cache: {}", cache_key);
        return Ok(Json(cached));
    }

    let doctors = DoctorService::new(state.db.clone()).list(Some(query.term())).await?;
    state.cache.set(&cache_key, &doctors, DEFAULT_TTL_SECS).await;

    Ok(Json(doctors))
}

pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Doctor>, AppError> {
    Ok(Json(DoctorService::new(state.db.clone()).require(doctor_id).await?))
}

pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor = DoctorService::new(state.db.clone()).create(request).await?;

    invalidate_doctors(&state).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Doctor created successfully",
            "doctor": doctor
        })),
    ))
}

pub async fn update_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(state.db.clone()).update(doctor_id, request).await?;

    invalidate_doctors(&state).await;

    Ok(Json(json!({
        "message": "Doctor updated successfully",
        "doctor": doctor
    })))
}

/// Blacklists the doctor. The profile and its appointments are kept.
pub async fn blacklist_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    DoctorService::new(state.db.clone()).set_active(doctor_id, false).await?;

    invalidate_doctors(&state).await;
    info!("Doctor {} blacklisted", doctor_id);

    Ok(Json(json!({ "message": "Doctor blacklisted successfully" })))
}

pub async fn activate_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(state.db.clone()).set_active(doctor_id, true).await?;

    invalidate_doctors(&state).await;

    Ok(Json(json!({
        "message": "Doctor activated successfully",
        "doctor": doctor
    })))
}

async fn invalidate_doctors(state: &AppState) {
    state.cache.clear_pattern(keys::ADMIN_DOCTORS_PATTERN).await;
    state.cache.clear_pattern(keys::DOCTOR_SEARCH_PATTERN).await;
    state.cache.delete(keys::ADMIN_DASHBOARD).await;
    state.cache.delete(keys::DEPARTMENTS).await;
}

// ==============================================================================
// PATIENTS
// ==============================================================================

pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let cache_key = keys::admin_patients(query.term());
    if let Some(cached) = state.cache.get::<Vec<Patient>>(&cache_key).await {
        return Ok(Json(cached));
    }

    let patients = PatientService::new(state.db.clone()).list(Some(query.term())).await?;
    state.cache.set(&cache_key, &patients, DEFAULT_TTL_SECS).await;

    Ok(Json(patients))
}

pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Patient>, AppError> {
    Ok(Json(PatientService::new(state.db.clone()).require(patient_id).await?))
}

pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(state.db.clone()).update(patient_id, request).await?;

    invalidate_patients(&state).await;

    Ok(Json(json!({
        "message": "Patient updated successfully",
        "patient": patient
    })))
}

pub async fn blacklist_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    PatientService::new(state.db.clone()).set_active(patient_id, false).await?;

    invalidate_patients(&state).await;
    info!("Patient {} blacklisted", patient_id);

    Ok(Json(json!({ "message": "Patient blacklisted successfully" })))
}

pub async fn activate_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(state.db.clone()).set_active(patient_id, true).await?;

    invalidate_patients(&state).await;

    Ok(Json(json!({
        "message": "Patient activated successfully",
        "patient": patient
    })))
}

async fn invalidate_patients(state: &AppState) {
    state.cache.clear_pattern(keys::ADMIN_PATIENTS_PATTERN).await;
    state.cache.delete(keys::ADMIN_DASHBOARD).await;
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let status = filter.status.as_deref().map(str::trim).unwrap_or_default();
    let cache_key = keys::admin_appointments(status, filter.is_upcoming());
    if let Some(cached) = state.cache.get::<Vec<Appointment>>(&cache_key).await {
        return Ok(Json(cached));
    }

    let appointments = HistoryService::new(state.db.clone())
        .list(ListScope::All, &filter, Local::now().date_naive())
        .await?;
    state.cache.set(&cache_key, &appointments, DEFAULT_TTL_SECS).await;

    Ok(Json(appointments))
}

/// Completed visits between the appointment's patient and doctor.
pub async fn appointment_history(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointment = LifecycleService::new(state.db.clone()).get(appointment_id).await?;

    let history = HistoryService::new(state.db.clone())
        .completed_history(appointment.patient_id, Some(appointment.doctor_id))
        .await?;

    Ok(Json(history))
}

// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use chrono::{Duration, Local, NaiveDate};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentFilter, AvailabilityRangeQuery, ListScope, SetAvailabilityRequest, SlotInput, TreatmentRequest,
};
use appointment_cell::services::availability::{AvailabilityService, BOOKING_WINDOW_DAYS};
use appointment_cell::services::history::HistoryService;
use appointment_cell::services::lifecycle::LifecycleService;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::Path;
use shared_utils::validation::parse_date;
use shared_utils::AppState;

use crate::services::doctor::DoctorService;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse_date)
        .transpose()
}

// ==============================================================================
// DASHBOARD & LISTINGS
// ==============================================================================

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(state.db.clone()).require(user.id).await?;
    let history = HistoryService::new(state.db.clone());
    let today = today();

    let today_appointments = history.booked_between(doctor.id, today, today).await?;
    let week_appointments = history
        .booked_between(doctor.id, today, today + Duration::days(BOOKING_WINDOW_DAYS))
        .await?;
    let assigned = history.assigned_patients(doctor.id).await?;

    Ok(Json(json!({
        "doctor": doctor,
        "today_appointments": today_appointments,
        "week_appointments": week_appointments,
        "assigned_patients_count": assigned.len()
    })))
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let appointments = HistoryService::new(state.db.clone())
        .list(ListScope::Doctor(user.id), &filter, today())
        .await?;

    Ok(Json(json!(appointments)))
}

pub async fn assigned_patients(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patients = HistoryService::new(state.db.clone()).assigned_patients(user.id).await?;
    Ok(Json(json!(patients)))
}

/// Completed visits of one patient with the calling doctor.
pub async fn patient_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let history = HistoryService::new(state.db.clone());

    if history.patient_summary(patient_id).await?.is_none() {
        return Err(AppError::NotFound("Patient not found".to_string()));
    }

    let visits = history.completed_history(patient_id, Some(user.id)).await?;
    Ok(Json(json!(visits)))
}

// ==============================================================================
// APPOINTMENT LIFECYCLE
// ==============================================================================

pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TreatmentRequest>,
) -> Result<Json<Value>, AppError> {
    let (appointment, treatment) = LifecycleService::new(state.db.clone())
        .complete(user.id, appointment_id, request)
        .await?;

    state.cache.invalidate_appointments(&appointment.patient_id.to_string()).await;

    Ok(Json(json!({
        "message": "Appointment marked as completed",
        "appointment": appointment,
        "treatment": treatment
    })))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = LifecycleService::new(state.db.clone())
        .cancel_by_doctor(user.id, appointment_id)
        .await?;

    state.cache.invalidate_appointments(&appointment.patient_id.to_string()).await;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment": appointment
    })))
}

pub async fn update_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TreatmentRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(state.db.clone());
    let treatment = lifecycle.update_treatment(user.id, appointment_id, request).await?;

    let appointment = lifecycle.get(appointment_id).await?;
    state.cache.invalidate_appointments(&appointment.patient_id.to_string()).await;

    Ok(Json(json!({
        "message": "History updated successfully",
        "treatment": treatment
    })))
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(range): Query<AvailabilityRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let start = optional_date(range.start_date.as_deref())?;
    let end = optional_date(range.end_date.as_deref())?;

    let slots = AvailabilityService::new(state.db.clone())
        .list_for_doctor(user.id, start, end)
        .await?;

    Ok(Json(json!(slots)))
}

/// Replaces the next week's availability. Malformed slots are skipped.
pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let Some(Value::Array(raw_slots)) = request.slots else {
        return Err(AppError::BadRequest("slots array is required".to_string()));
    };

    let doctor = DoctorService::new(state.db.clone()).require(user.id).await?;

    let slots: Vec<SlotInput> = raw_slots
        .into_iter()
        .filter_map(|slot| serde_json::from_value(slot).ok())
        .collect();

    let created = AvailabilityService::new(state.db.clone())
        .replace_week(doctor.id, &slots, today())
        .await?;

    debug!("Doctor {} now has {} slots this week", doctor.id, created.len());

    Ok(Json(json!({
        "message": "Availability updated successfully",
        "slots": created
    })))
}

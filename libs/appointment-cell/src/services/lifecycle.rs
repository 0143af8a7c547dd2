// libs/appointment-cell/src/services/lifecycle.rs
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus, Treatment, TreatmentRequest};

pub const DEFAULT_VISIT_TYPE: &str = "In-person";

/// Which side of the appointment is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Patient(Uuid),
    Doctor(Uuid),
}

impl Actor {
    pub fn owns(&self, appointment: &Appointment) -> bool {
        match self {
            Actor::Patient(id) => appointment.patient_id == *id,
            Actor::Doctor(id) => appointment.doctor_id == *id,
        }
    }
}

/// Body for a treatment upsert; absent optional fields become empty strings.
pub fn treatment_record(appointment_id: Uuid, diagnosis: &str, request: &TreatmentRequest) -> Value {
    let text = |field: &Option<String>| field.as_deref().map(str::trim).unwrap_or_default().to_string();
    let visit_type = request
        .visit_type
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VISIT_TYPE);

    json!({
        "appointment_id": appointment_id,
        "visit_type": visit_type,
        "diagnosis": diagnosis,
        "prescription": text(&request.prescription),
        "medicines": text(&request.medicines),
        "tests_done": text(&request.tests_done),
        "notes": text(&request.notes),
        "updated_at": Utc::now(),
    })
}

/// Only the fields present in the request; `None` when nothing changes.
pub fn treatment_patch(request: &TreatmentRequest) -> Option<Value> {
    let mut patch = Map::new();
    let fields = [
        ("visit_type", &request.visit_type),
        ("diagnosis", &request.diagnosis),
        ("prescription", &request.prescription),
        ("medicines", &request.medicines),
        ("tests_done", &request.tests_done),
        ("notes", &request.notes),
    ];

    for (name, value) in fields {
        if let Some(value) = value {
            patch.insert(name.to_string(), Value::String(value.trim().to_string()));
        }
    }

    if patch.is_empty() {
        return None;
    }

    patch.insert("updated_at".to_string(), json!(Utc::now()));
    Some(Value::Object(patch))
}

pub struct LifecycleService {
    supabase: SupabaseClient,
}

impl LifecycleService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=*,treatment:treatments(*)", appointment_id);

        self.supabase
            .select_one(&path)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn owned_by(&self, actor: Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.get(appointment_id).await?;
        if !actor.owns(&appointment) {
            warn!("{:?} attempted to act on appointment {}", actor, appointment_id);
            return Err(AppointmentError::Unauthorized);
        }
        Ok(appointment)
    }

    pub async fn cancel_by_patient(&self, patient_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.cancel(Actor::Patient(patient_id), appointment_id).await
    }

    pub async fn cancel_by_doctor(&self, doctor_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.cancel(Actor::Doctor(doctor_id), appointment_id).await
    }

    async fn cancel(&self, actor: Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.owned_by(actor, appointment_id).await?;

        if !appointment.status.can_transition_to(&AppointmentStatus::Cancelled) {
            return Err(AppointmentError::NotCancellable);
        }

        // The status filter makes the update a no-op if someone else moved it first.
        let filter = format!("id=eq.{}&status=eq.{}", appointment_id, AppointmentStatus::Booked);
        let updated: Vec<Appointment> = self
            .supabase
            .update(
                "appointments",
                &filter,
                json!({ "status": AppointmentStatus::Cancelled, "updated_at": Utc::now() }),
            )
            .await?;

        let cancelled = updated.into_iter().next().ok_or(AppointmentError::NotCancellable)?;
        info!("Appointment {} cancelled by {:?}", appointment_id, actor);

        Ok(cancelled)
    }

    /// Records the treatment, then marks the appointment completed.
    pub async fn complete(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
        request: TreatmentRequest,
    ) -> Result<(Appointment, Treatment), AppointmentError> {
        let diagnosis = request
            .diagnosis
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AppointmentError::Validation("diagnosis is required".to_string()))?;

        let appointment = self.owned_by(Actor::Doctor(doctor_id), appointment_id).await?;

        if !appointment.status.can_transition_to(&AppointmentStatus::Completed) {
            return Err(AppointmentError::NotCompletable(appointment.status));
        }

        let treatment: Treatment = self
            .supabase
            .upsert("treatments", "appointment_id", treatment_record(appointment_id, diagnosis, &request))
            .await?;
        debug!("Treatment {} recorded for appointment {}", treatment.id, appointment_id);

        let filter = format!(
            "id=eq.{}&status=in.({},{})",
            appointment_id,
            AppointmentStatus::Booked,
            AppointmentStatus::Completed
        );
        let updated: Result<Vec<Appointment>, DbError> = self
            .supabase
            .update(
                "appointments",
                &filter,
                json!({ "status": AppointmentStatus::Completed, "updated_at": Utc::now() }),
            )
            .await;

        let completed = match updated {
            Ok(rows) => rows.into_iter().next(),
            Err(e) => {
                self.discard_treatment(&appointment, &treatment).await;
                return Err(e.into());
            }
        };

        let Some(completed) = completed else {
            warn!("Appointment {} left Booked before completion", appointment_id);
            self.discard_treatment(&appointment, &treatment).await;
            return Err(AppointmentError::NotCompletable(AppointmentStatus::Cancelled));
        };

        info!("Appointment {} completed by doctor {}", appointment_id, doctor_id);
        Ok((completed, treatment))
    }

    /// Drops a treatment written for an appointment that never became
    /// completed. Re-completions keep theirs: the appointment already had one.
    async fn discard_treatment(&self, appointment: &Appointment, treatment: &Treatment) {
        if appointment.status != AppointmentStatus::Booked {
            return;
        }

        match self.supabase.delete("treatments", &format!("id=eq.{}", treatment.id)).await {
            Ok(()) => debug!("Discarded treatment {} for appointment {}", treatment.id, appointment.id),
            Err(e) => error!("Failed to discard treatment {} for appointment {}: {}", treatment.id, appointment.id, e),
        }
    }

    pub async fn update_treatment(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
        request: TreatmentRequest,
    ) -> Result<Treatment, AppointmentError> {
        let appointment = self.owned_by(Actor::Doctor(doctor_id), appointment_id).await?;

        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::HistoryNotEditable);
        }

        let existing = appointment.treatment.ok_or(AppointmentError::TreatmentNotFound)?;

        if let Some(diagnosis) = request.diagnosis.as_deref() {
            if diagnosis.trim().is_empty() {
                return Err(AppointmentError::Validation("diagnosis is required".to_string()));
            }
        }

        let Some(patch) = treatment_patch(&request) else {
            return Ok(existing);
        };

        let updated: Vec<Treatment> = self
            .supabase
            .update("treatments", &format!("id=eq.{}", existing.id), patch)
            .await?;

        let treatment = updated.into_iter().next().ok_or(AppointmentError::TreatmentNotFound)?;
        info!("Treatment {} updated by doctor {}", treatment.id, doctor_id);

        Ok(treatment)
    }
}

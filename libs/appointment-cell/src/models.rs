// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "Booked",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    /// Completing twice is allowed: it rewrites the treatment record.
    pub fn can_transition_to(&self, target: &AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, target),
            (Booked, Completed) | (Booked, Cancelled) | (Completed, Completed)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "booked" => Ok(AppointmentStatus::Booked),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub department: Option<DepartmentRef>,
}

impl DoctorSummary {
    pub fn full_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
}

impl PatientSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub visit_type: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub medicines: Option<String>,
    pub tests_done: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "one_or_many")]
    pub treatment: Option<Treatment>,
}

impl Appointment {
    pub fn slot_key(&self) -> (NaiveDate, NaiveTime) {
        (self.scheduled_date, self.scheduled_time)
    }
}

/// One visit flattened for reports: appointment, doctor and treatment text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryEntry {
    pub appointment_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub doctor: String,
    pub department: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub visit_type: String,
    pub diagnosis: String,
    pub prescription: String,
    pub medicines: String,
    pub tests_done: String,
    pub notes: String,
}

impl From<&Appointment> for HistoryEntry {
    fn from(appointment: &Appointment) -> Self {
        let doctor = appointment.doctor.as_ref();
        let treatment = appointment.treatment.as_ref();
        let text = |value: Option<&String>| value.cloned().unwrap_or_default();

        Self {
            appointment_id: appointment.id,
            date: appointment.scheduled_date,
            time: appointment.scheduled_time,
            doctor: doctor.map(DoctorSummary::full_name).unwrap_or_default(),
            department: doctor
                .and_then(|d| d.department.as_ref())
                .map(|dep| dep.name.clone())
                .unwrap_or_default(),
            status: appointment.status,
            reason: text(appointment.reason.as_ref()),
            visit_type: text(treatment.and_then(|t| t.visit_type.as_ref())),
            diagnosis: text(treatment.and_then(|t| t.diagnosis.as_ref())),
            prescription: text(treatment.and_then(|t| t.prescription.as_ref())),
            medicines: text(treatment.and_then(|t| t.medicines.as_ref())),
            tests_done: text(treatment.and_then(|t| t.tests_done.as_ref())),
            notes: text(treatment.and_then(|t| t.notes.as_ref())),
        }
    }
}

/// PostgREST embeds a one-to-one relation as an object or, on older
/// servers, as a single-element array.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => match items.into_iter().next() {
            Some(first) => first,
            None => return Ok(None),
        },
        Some(other) => other,
    };

    serde_json::from_value(value).map(Some).map_err(serde::de::Error::custom)
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Availability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub available_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

impl Availability {
    pub fn slot_key(&self) -> (NaiveDate, NaiveTime) {
        (self.available_date, self.start_time)
    }
}

/// The date and start time held by a booked appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BookedSlot {
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
}

/// One slot as submitted by a doctor; every field is optional so malformed
/// entries can be skipped rather than failing the whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotInput {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetAvailabilityRequest {
    #[serde(default)]
    pub slots: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// ==============================================================================
// REQUEST / FILTER MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreatmentRequest {
    pub visit_type: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub medicines: Option<String>,
    pub tests_done: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<String>,
    pub upcoming: Option<String>,
    pub past: Option<String>,
}

impl AppointmentFilter {
    pub fn status(&self) -> Result<Option<AppointmentStatus>, String> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    pub fn is_upcoming(&self) -> bool {
        flag(&self.upcoming)
    }

    pub fn is_past(&self) -> bool {
        flag(&self.past)
    }
}

fn flag(value: &Option<String>) -> bool {
    value.as_deref().map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Whose appointments a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    Doctor(Uuid),
    Patient(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_transitions() {
        use AppointmentStatus::*;
        assert!(Booked.can_transition_to(&Completed));
        assert!(Booked.can_transition_to(&Cancelled));
        assert!(Completed.can_transition_to(&Completed));
        assert!(!Completed.can_transition_to(&Cancelled));
        assert!(!Cancelled.can_transition_to(&Booked));
        assert!(!Cancelled.can_transition_to(&Completed));
    }

    #[test]
    fn status_parses_loosely() {
        assert_eq!("booked".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Booked);
        assert_eq!("Canceled".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Cancelled);
        assert!("pending".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn treatment_embed_accepts_object_array_or_null() {
        let appointment_id = Uuid::new_v4();
        let base = json!({
            "id": appointment_id,
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "scheduled_date": "2025-01-02",
            "scheduled_time": "10:00:00",
            "status": "Completed",
            "reason": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        });
        let treatment = json!({
            "id": Uuid::new_v4(),
            "appointment_id": appointment_id,
            "visit_type": "In-person",
            "diagnosis": "Flu",
            "prescription": null,
            "medicines": null,
            "tests_done": null,
            "notes": null,
            "created_at": "2025-01-02T00:00:00Z",
            "updated_at": "2025-01-02T00:00:00Z"
        });

        let mut as_object = base.clone();
        as_object["treatment"] = treatment.clone();
        let parsed: Appointment = serde_json::from_value(as_object).unwrap();
        assert_eq!(parsed.treatment.unwrap().diagnosis.as_deref(), Some("Flu"));

        let mut as_array = base.clone();
        as_array["treatment"] = json!([treatment]);
        let parsed: Appointment = serde_json::from_value(as_array).unwrap();
        assert!(parsed.treatment.is_some());

        let mut as_null = base.clone();
        as_null["treatment"] = Value::Null;
        let parsed: Appointment = serde_json::from_value(as_null).unwrap();
        assert!(parsed.treatment.is_none());

        let parsed: Appointment = serde_json::from_value(base).unwrap();
        assert!(parsed.treatment.is_none());
    }

    #[test]
    fn history_entry_blanks_missing_parts() {
        let appointment: Appointment = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "scheduled_date": "2025-01-02",
            "scheduled_time": "10:00:00",
            "status": "Completed",
            "reason": "Headache",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "doctor": { "id": Uuid::new_v4(), "first_name": "Meera", "last_name": "Nair" }
        }))
        .unwrap();

        let entry = HistoryEntry::from(&appointment);
        assert_eq!(entry.doctor, "Dr. Meera Nair");
        assert_eq!(entry.department, "");
        assert_eq!(entry.reason, "Headache");
        assert_eq!(entry.diagnosis, "");
    }

    #[test]
    fn filter_flags() {
        let filter = AppointmentFilter {
            status: Some("completed".into()),
            upcoming: Some("TRUE".into()),
            past: Some("no".into()),
        };
        assert_eq!(filter.status().unwrap(), Some(AppointmentStatus::Completed));
        assert!(filter.is_upcoming());
        assert!(!filter.is_past());
    }
}

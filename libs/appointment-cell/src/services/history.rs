// libs/appointment-cell/src/services/history.rs
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, ListScope, PatientSummary};
use crate::services::availability::format_date;

/// Appointment columns plus both parties and the treatment record.
pub const APPOINTMENT_SELECT: &str = "*,doctor:doctors(id,first_name,last_name,department:departments(id,name)),patient:patients(id,first_name,last_name,date_of_birth,contact_number,gender,blood_group),treatment:treatments(*)";

pub const PATIENT_SUMMARY_SELECT: &str = "id,first_name,last_name,date_of_birth,contact_number,gender,blood_group";

const NEWEST_FIRST: &str = "scheduled_date.desc,scheduled_time.desc";
const OLDEST_FIRST: &str = "scheduled_date.asc,scheduled_time.asc";

/// Builds the PostgREST query string for an appointment listing.
pub fn list_query(scope: ListScope, filter: &AppointmentFilter, today: NaiveDate) -> Result<String, AppointmentError> {
    let status = filter.status().map_err(AppointmentError::Validation)?;
    let mut params = vec![format!("select={}", APPOINTMENT_SELECT)];

    match scope {
        ListScope::All => {}
        ListScope::Doctor(id) => params.push(format!("doctor_id=eq.{}", id)),
        ListScope::Patient(id) => params.push(format!("patient_id=eq.{}", id)),
    }

    if let Some(status) = status {
        params.push(format!("status=eq.{}", status));
    }

    let order = match scope {
        ListScope::All if filter.is_upcoming() => {
            params.push(format!("scheduled_date=gte.{}", format_date(today)));
            format!("{},created_at.desc", OLDEST_FIRST)
        }
        ListScope::All => "created_at.desc".to_string(),
        ListScope::Doctor(_) | ListScope::Patient(_) if filter.is_upcoming() => {
            params.push(format!("scheduled_date=gte.{}", format_date(today)));
            params.push(format!("status=eq.{}", AppointmentStatus::Booked));
            OLDEST_FIRST.to_string()
        }
        ListScope::Doctor(_) => OLDEST_FIRST.to_string(),
        ListScope::Patient(_) if filter.is_past() => {
            params.push(format!("status=eq.{}", AppointmentStatus::Completed));
            NEWEST_FIRST.to_string()
        }
        ListScope::Patient(_) => NEWEST_FIRST.to_string(),
    };
    params.push(format!("order={}", order));

    Ok(params.join("&"))
}

/// Distinct patients, ordered by name.
pub fn distinct_patients(patients: impl IntoIterator<Item = PatientSummary>) -> Vec<PatientSummary> {
    let mut by_id: HashMap<Uuid, PatientSummary> = HashMap::new();
    for patient in patients {
        by_id.entry(patient.id).or_insert(patient);
    }

    let mut unique: Vec<PatientSummary> = by_id.into_values().collect();
    unique.sort_by(|a, b| {
        (a.last_name.to_lowercase(), a.first_name.to_lowercase())
            .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
    });
    unique
}

#[derive(Debug, Deserialize)]
struct PatientLink {
    #[serde(default)]
    patient: Option<PatientSummary>,
}

#[derive(Clone)]
pub struct HistoryService {
    supabase: SupabaseClient,
}

impl HistoryService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn list(
        &self,
        scope: ListScope,
        filter: &AppointmentFilter,
        today: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let query = list_query(scope, filter, today)?;
        debug!("Listing appointments for {:?}", scope);

        Ok(self.supabase.select(&format!("/rest/v1/appointments?{}", query)).await?)
    }

    /// Completed visits with their treatments, newest first.
    pub async fn completed_history(
        &self,
        patient_id: Uuid,
        doctor_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?select={}&patient_id=eq.{}&status=eq.{}",
            APPOINTMENT_SELECT,
            patient_id,
            AppointmentStatus::Completed
        );
        if let Some(doctor_id) = doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }
        path.push_str(&format!("&order={}", NEWEST_FIRST));

        Ok(self.supabase.select(&path).await?)
    }

    /// Booked appointments of a doctor with a date in `[from, to]`.
    pub async fn booked_between(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select={}&doctor_id=eq.{}&status=eq.{}&scheduled_date=gte.{}&scheduled_date=lte.{}&order={}",
            APPOINTMENT_SELECT,
            doctor_id,
            AppointmentStatus::Booked,
            format_date(from),
            format_date(to),
            OLDEST_FIRST
        );

        Ok(self.supabase.select(&path).await?)
    }

    /// Booked appointments of a patient from today on.
    pub async fn upcoming_for_patient(&self, patient_id: Uuid, today: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            upcoming: Some("true".to_string()),
            ..Default::default()
        };
        self.list(ListScope::Patient(patient_id), &filter, today).await
    }

    /// Every patient who has ever had an appointment with the doctor.
    pub async fn assigned_patients(&self, doctor_id: Uuid) -> Result<Vec<PatientSummary>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select=patient_id,patient:patients({})&doctor_id=eq.{}",
            PATIENT_SUMMARY_SELECT, doctor_id
        );
        let links: Vec<PatientLink> = self.supabase.select(&path).await?;

        Ok(distinct_patients(links.into_iter().filter_map(|l| l.patient)))
    }

    pub async fn patient_summary(&self, patient_id: Uuid) -> Result<Option<PatientSummary>, AppointmentError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select={}", patient_id, PATIENT_SUMMARY_SELECT);
        Ok(self.supabase.select_one(&path).await?)
    }

    /// Row count for a raw PostgREST filter, e.g. `status=eq.Booked`.
    pub async fn count(&self, filter: &str) -> Result<u64, AppointmentError> {
        Ok(self.supabase.count("appointments", filter).await?)
    }

    pub async fn count_upcoming(&self, today: NaiveDate) -> Result<u64, AppointmentError> {
        let filter = format!(
            "scheduled_date=gte.{}&status=eq.{}",
            format_date(today),
            AppointmentStatus::Booked
        );
        self.count(&filter).await
    }
}

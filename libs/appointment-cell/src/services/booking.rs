// libs/appointment-cell/src/services/booking.rs
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};
use shared_utils::validation::{parse_date, parse_time, required};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus, BookAppointmentRequest};
use crate::services::availability::{format_date, format_time, AvailabilityService};

#[derive(Debug, Deserialize)]
struct AccountFlag {
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct DoctorAccount {
    #[serde(default)]
    account: Option<AccountFlag>,
}

/// A validated booking, ready to be checked against the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
}

impl SlotRequest {
    /// Parses the raw request. Past dates are rejected; same-day slots are
    /// accepted regardless of the time of day.
    pub fn parse(request: &BookAppointmentRequest, today: NaiveDate) -> Result<Self, AppointmentError> {
        let doctor_id = required(request.doctor_id.as_deref(), "doctor_id")
            .map_err(|e| AppointmentError::Validation(e.message().to_string()))?;
        let doctor_id = Uuid::parse_str(doctor_id)
            .map_err(|_| AppointmentError::Validation("Invalid doctor_id".to_string()))?;

        let date = required(request.scheduled_date.as_deref(), "scheduled_date")
            .map_err(|e| AppointmentError::Validation(e.message().to_string()))?;
        let time = required(request.scheduled_time.as_deref(), "scheduled_time")
            .map_err(|e| AppointmentError::Validation(e.message().to_string()))?;

        let (Ok(date), Ok(time)) = (parse_date(date), parse_time(time)) else {
            return Err(AppointmentError::InvalidDateTime);
        };

        if date < today {
            return Err(AppointmentError::PastDate);
        }

        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(Self { doctor_id, date, time, reason })
    }
}

pub struct BookingService {
    supabase: SupabaseClient,
    availability: AvailabilityService,
}

impl BookingService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self {
            availability: AvailabilityService::new(supabase.clone()),
            supabase,
        }
    }

    pub async fn book(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
        today: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        let slot = SlotRequest::parse(&request, today)?;
        debug!("Booking request from patient {} for doctor {} at {} {}", patient_id, slot.doctor_id, slot.date, slot.time);

        self.ensure_doctor_active(slot.doctor_id).await?;

        if self.availability.find_slot(slot.doctor_id, slot.date, slot.time).await?.is_none() {
            return Err(AppointmentError::SlotNotAvailable);
        }

        if self.is_slot_booked(slot.doctor_id, slot.date, slot.time).await? {
            return Err(AppointmentError::SlotTaken);
        }

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": slot.doctor_id,
            "scheduled_date": format_date(slot.date),
            "scheduled_time": format_time(slot.time),
            "status": AppointmentStatus::Booked,
            "reason": slot.reason,
        });

        let appointment: Appointment = match self.supabase.insert("appointments", body).await {
            Ok(appointment) => appointment,
            Err(DbError::Conflict(detail)) => {
                warn!("Concurrent booking for doctor {} at {} {}: {}", slot.doctor_id, slot.date, slot.time, detail);
                return Err(AppointmentError::SlotConflict);
            }
            Err(e) => return Err(e.into()),
        };

        info!("Appointment {} booked for patient {} with doctor {}", appointment.id, patient_id, slot.doctor_id);
        Ok(appointment)
    }

    async fn ensure_doctor_active(&self, doctor_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=id,account:users(is_active)", doctor_id);
        let doctor: Option<DoctorAccount> = self.supabase.select_one(&path).await?;

        match doctor {
            Some(DoctorAccount { account: Some(AccountFlag { is_active: true }) }) => Ok(()),
            _ => Err(AppointmentError::DoctorUnavailable),
        }
    }

    async fn is_slot_booked(&self, doctor_id: Uuid, date: NaiveDate, time: NaiveTime) -> Result<bool, AppointmentError> {
        let filter = format!(
            "doctor_id=eq.{}&scheduled_date=eq.{}&scheduled_time=eq.{}&status=eq.{}",
            doctor_id,
            format_date(date),
            format_time(time),
            AppointmentStatus::Booked
        );

        Ok(self.supabase.count("appointments", &filter).await? > 0)
    }
}

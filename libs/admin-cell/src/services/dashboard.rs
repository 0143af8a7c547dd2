use chrono::NaiveDate;
use tracing::debug;

use appointment_cell::services::history::HistoryService;
use doctor_cell::DoctorService;
use patient_cell::PatientService;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

use crate::models::DashboardStats;

pub struct DashboardService {
    doctors: DoctorService,
    patients: PatientService,
    appointments: HistoryService,
}

impl DashboardService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self {
            doctors: DoctorService::new(supabase.clone()),
            patients: PatientService::new(supabase.clone()),
            appointments: HistoryService::new(supabase),
        }
    }

    pub async fn stats(&self, today: NaiveDate) -> Result<DashboardStats, AppError> {
        let stats = DashboardStats {
            total_doctors: self.doctors.count().await?,
            total_patients: self.patients.count().await?,
            total_appointments: self.appointments.count("").await?,
            upcoming_appointments: self.appointments.count_upcoming(today).await?,
        };

        debug!("Dashboard stats computed: {:?}", stats);
        Ok(stats)
    }
}

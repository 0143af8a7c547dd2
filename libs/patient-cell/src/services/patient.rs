use serde_json::{json, Map, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::accounts::{AccountService, NewAccount};
use shared_utils::validation::{parse_date, required, validate_contact_number, validate_email};

use crate::models::{Patient, RegisterPatientRequest, UpdatePatientRequest};

pub const PATIENT_SELECT: &str = "*,account:users(username,email,is_active)";

#[derive(Clone)]
pub struct PatientService {
    supabase: SupabaseClient,
    accounts: AccountService,
}

impl PatientService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self {
            accounts: AccountService::new(supabase.clone()),
            supabase,
        }
    }

    pub async fn get(&self, patient_id: Uuid) -> Result<Option<Patient>, AppError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select={}", patient_id, PATIENT_SELECT);
        Ok(self.supabase.select_one(&path).await?)
    }

    pub async fn require(&self, patient_id: Uuid) -> Result<Patient, AppError> {
        self.get(patient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Patient>, AppError> {
        let path = format!("/rest/v1/patients?select={}&order=last_name.asc,first_name.asc", PATIENT_SELECT);
        let patients: Vec<Patient> = self.supabase.select(&path).await?;

        Ok(match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(query) => patients.into_iter().filter(|p| p.matches(query)).collect(),
            None => patients,
        })
    }

    /// Self-registration. Creates the account, then the profile; the account
    /// is removed again if the profile cannot be written.
    pub async fn register(&self, request: RegisterPatientRequest) -> Result<Patient, AppError> {
        if let Some(role) = request.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            if !role.eq_ignore_ascii_case(Role::Patient.as_str()) {
                return Err(AppError::BadRequest("Only patients can register".to_string()));
            }
        }

        let username = required(request.username.as_deref(), "username")?;
        let email = required(request.email.as_deref(), "email")?;
        let password = required(request.password.as_deref(), "password")?;
        let first_name = required(request.first_name.as_deref(), "first_name")?;
        let last_name = required(request.last_name.as_deref(), "last_name")?;
        let date_of_birth = parse_date(required(request.date_of_birth.as_deref(), "date_of_birth")?)?;
        let contact_number = required(request.contact_number.as_deref(), "contact_number")?;

        validate_email(email)?;
        validate_contact_number(contact_number)?;

        self.accounts.ensure_unique(Some(username), Some(email), None).await?;

        let account = self
            .accounts
            .create(NewAccount { username, email, password, role: Role::Patient })
            .await?;

        let profile = json!({
            "id": account.id,
            "first_name": first_name,
            "last_name": last_name,
            "date_of_birth": date_of_birth.format("%Y-%m-%d").to_string(),
            "contact_number": contact_number,
            "address": request.address.unwrap_or_default(),
            "gender": request.gender,
            "blood_group": request.blood_group,
        });

        if let Err(e) = self.supabase.insert::<Value>("patients", profile).await {
            error!("Patient profile insert failed for {}: {}", account.id, e);
            self.accounts.remove(account.id).await;
            return Err(e.into());
        }

        info!("Patient {} registered", account.id);
        self.require(account.id).await
    }

    /// Partial update. Username and email must stay unique across accounts.
    pub async fn update(&self, patient_id: Uuid, request: UpdatePatientRequest) -> Result<Patient, AppError> {
        self.require(patient_id).await?;

        if let Some(email) = request.email.as_deref() {
            validate_email(email)?;
        }
        if let Some(contact) = request.contact_number.as_deref().filter(|c| !c.trim().is_empty()) {
            validate_contact_number(contact)?;
        }
        let date_of_birth = request.date_of_birth.as_deref().map(parse_date).transpose()?;

        self.accounts
            .update_identity(patient_id, request.username.as_deref(), request.email.as_deref())
            .await?;

        let mut patch = Map::new();
        if let Some(v) = request.first_name {
            patch.insert("first_name".into(), json!(v));
        }
        if let Some(v) = request.last_name {
            patch.insert("last_name".into(), json!(v));
        }
        if let Some(v) = date_of_birth {
            patch.insert("date_of_birth".into(), json!(v.format("%Y-%m-%d").to_string()));
        }
        if let Some(v) = request.contact_number {
            patch.insert("contact_number".into(), json!(v));
        }
        if let Some(v) = request.address {
            patch.insert("address".into(), json!(v));
        }
        if let Some(v) = request.gender {
            patch.insert("gender".into(), json!(v));
        }
        if let Some(v) = request.blood_group {
            patch.insert("blood_group".into(), json!(v));
        }
        if let Some(v) = request.medical_history {
            patch.insert("medical_history".into(), json!(v));
        }
        if let Some(v) = request.emergency_contact {
            patch.insert("emergency_contact".into(), json!(v));
        }

        if !patch.is_empty() {
            let _: Vec<Value> = self
                .supabase
                .update("patients", &format!("id=eq.{}", patient_id), Value::Object(patch))
                .await?;
        }

        debug!("Patient {} updated", patient_id);
        self.require(patient_id).await
    }

    /// Blacklists or reinstates the patient's account.
    pub async fn set_active(&self, patient_id: Uuid, active: bool) -> Result<Patient, AppError> {
        self.require(patient_id).await?;
        self.accounts.set_active(patient_id, active).await?;
        self.require(patient_id).await
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        Ok(self.supabase.count("patients", "").await?)
    }
}

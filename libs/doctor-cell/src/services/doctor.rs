use serde_json::{json, Map, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use department_cell::services::department::DepartmentService;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::accounts::{AccountService, NewAccount};
use shared_utils::validation::{required, validate_contact_number, validate_email};

use crate::models::{CreateDoctorRequest, Doctor, UpdateDoctorRequest};

pub const DOCTOR_SELECT: &str = "*,account:users(username,email,is_active),department:departments(id,name)";

/// Doctor directory backed by the `doctors` table and its account row.
#[derive(Clone)]
pub struct DoctorService {
    supabase: SupabaseClient,
    accounts: AccountService,
    departments: DepartmentService,
}

impl DoctorService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self {
            accounts: AccountService::new(supabase.clone()),
            departments: DepartmentService::new(supabase.clone()),
            supabase,
        }
    }

    /// All doctors, optionally narrowed by a case-insensitive search.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Doctor>, AppError> {
        let path = format!("/rest/v1/doctors?select={}&order=last_name.asc,first_name.asc", DOCTOR_SELECT);
        let doctors: Vec<Doctor> = self.supabase.select(&path).await?;

        Ok(match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(query) => doctors.into_iter().filter(|d| d.matches(query)).collect(),
            None => doctors,
        })
    }

    /// Active doctors matching `query`.
    pub async fn search_active(&self, query: &str) -> Result<Vec<Doctor>, AppError> {
        Ok(self
            .list(Some(query))
            .await?
            .into_iter()
            .filter(Doctor::is_active)
            .collect())
    }

    pub async fn by_department(&self, department_id: Uuid) -> Result<Vec<Doctor>, AppError> {
        let path = format!(
            "/rest/v1/doctors?select={}&department_id=eq.{}&order=last_name.asc",
            DOCTOR_SELECT, department_id
        );
        let doctors: Vec<Doctor> = self.supabase.select(&path).await?;

        Ok(doctors.into_iter().filter(Doctor::is_active).collect())
    }

    pub async fn get(&self, doctor_id: Uuid) -> Result<Option<Doctor>, AppError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select={}", doctor_id, DOCTOR_SELECT);
        Ok(self.supabase.select_one(&path).await?)
    }

    pub async fn require(&self, doctor_id: Uuid) -> Result<Doctor, AppError> {
        self.get(doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))
    }

    async fn ensure_department(&self, department_id: Uuid) -> Result<(), AppError> {
        match self.departments.get(department_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Department not found".to_string())),
        }
    }

    /// Creates the account and the profile. A failed profile insert removes
    /// the account again.
    pub async fn create(&self, request: CreateDoctorRequest) -> Result<Doctor, AppError> {
        let username = required(request.username.as_deref(), "username")?;
        let email = required(request.email.as_deref(), "email")?;
        let password = required(request.password.as_deref(), "password")?;
        let first_name = required(request.first_name.as_deref(), "first_name")?;
        let last_name = required(request.last_name.as_deref(), "last_name")?;
        let department_id = request
            .department_id
            .ok_or_else(|| AppError::ValidationError("department_id is required".to_string()))?;

        validate_email(email)?;
        if let Some(contact) = request.contact_number.as_deref().filter(|c| !c.trim().is_empty()) {
            validate_contact_number(contact)?;
        }

        self.ensure_department(department_id).await?;
        self.accounts.ensure_unique(Some(username), Some(email), None).await?;

        let account = self
            .accounts
            .create(NewAccount { username, email, password, role: Role::Doctor })
            .await?;

        let profile = json!({
            "id": account.id,
            "first_name": first_name,
            "last_name": last_name,
            "department_id": department_id,
            "experience_years": request.experience_years,
            "qualifications": request.qualifications,
            "bio": request.bio,
            "contact_number": request.contact_number,
        });

        if let Err(e) = self.supabase.insert::<Value>("doctors", profile).await {
            error!("Doctor profile insert failed for {}: {}", account.id, e);
            self.accounts.remove(account.id).await;
            return Err(e.into());
        }

        info!("Doctor {} created", account.id);
        self.require(account.id).await
    }

    pub async fn update(&self, doctor_id: Uuid, request: UpdateDoctorRequest) -> Result<Doctor, AppError> {
        self.require(doctor_id).await?;

        if let Some(email) = request.email.as_deref() {
            validate_email(email)?;
        }
        if let Some(contact) = request.contact_number.as_deref().filter(|c| !c.trim().is_empty()) {
            validate_contact_number(contact)?;
        }
        if let Some(department_id) = request.department_id {
            self.ensure_department(department_id).await?;
        }

        self.accounts
            .update_identity(doctor_id, request.username.as_deref(), request.email.as_deref())
            .await?;

        let mut patch = Map::new();
        if let Some(v) = request.first_name {
            patch.insert("first_name".into(), json!(v));
        }
        if let Some(v) = request.last_name {
            patch.insert("last_name".into(), json!(v));
        }
        if let Some(v) = request.department_id {
            patch.insert("department_id".into(), json!(v));
        }
        if let Some(v) = request.experience_years {
            patch.insert("experience_years".into(), json!(v));
        }
        if let Some(v) = request.qualifications {
            patch.insert("qualifications".into(), json!(v));
        }
        if let Some(v) = request.bio {
            patch.insert("bio".into(), json!(v));
        }
        if let Some(v) = request.contact_number {
            patch.insert("contact_number".into(), json!(v));
        }

        if !patch.is_empty() {
            let _: Vec<Value> = self
                .supabase
                .update("doctors", &format!("id=eq.{}", doctor_id), Value::Object(patch))
                .await?;
        }

        debug!("Doctor {} updated", doctor_id);
        self.require(doctor_id).await
    }

    /// Blacklists or reinstates the doctor's account.
    pub async fn set_active(&self, doctor_id: Uuid, active: bool) -> Result<Doctor, AppError> {
        self.require(doctor_id).await?;
        self.accounts.set_active(doctor_id, active).await?;
        self.require(doctor_id).await
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        Ok(self.supabase.count("doctors", "").await?)
    }
}

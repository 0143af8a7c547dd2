// libs/department-cell/src/services/department.rs
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};
use shared_models::error::AppError;
use shared_utils::validation::required;

use crate::models::{CreateDepartmentRequest, Department, DepartmentListing, DEFAULT_DEPARTMENTS};

#[derive(Debug, Deserialize)]
struct DoctorDepartment {
    department_id: Option<Uuid>,
}

/// Pairs each department with the number of doctors assigned to it.
pub fn attach_counts(departments: Vec<Department>, assignments: &[Option<Uuid>]) -> Vec<DepartmentListing> {
    let mut counts: HashMap<Uuid, u64> = HashMap::new();
    for id in assignments.iter().flatten() {
        *counts.entry(*id).or_default() += 1;
    }

    departments
        .into_iter()
        .map(|department| DepartmentListing {
            doctors_registered: counts.get(&department.id).copied().unwrap_or(0),
            department,
        })
        .collect()
}

#[derive(Clone)]
pub struct DepartmentService {
    supabase: SupabaseClient,
}

impl DepartmentService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn list(&self) -> Result<Vec<Department>, AppError> {
        Ok(self.supabase.select("/rest/v1/departments?order=name.asc").await?)
    }

    pub async fn list_with_counts(&self) -> Result<Vec<DepartmentListing>, AppError> {
        let departments = self.list().await?;
        let doctors: Vec<DoctorDepartment> = self.supabase.select("/rest/v1/doctors?select=department_id").await?;
        let assignments: Vec<Option<Uuid>> = doctors.into_iter().map(|d| d.department_id).collect();

        Ok(attach_counts(departments, &assignments))
    }

    pub async fn get(&self, department_id: Uuid) -> Result<Option<Department>, AppError> {
        let path = format!("/rest/v1/departments?id=eq.{}", department_id);
        Ok(self.supabase.select_one(&path).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Department>, AppError> {
        let path = format!("/rest/v1/departments?name=eq.{}", urlencoding::encode(name));
        Ok(self.supabase.select_one(&path).await?)
    }

    pub async fn create(&self, request: CreateDepartmentRequest) -> Result<Department, AppError> {
        let name = required(request.name.as_deref(), "name")?;
        let description = required(request.description.as_deref(), "description")?;

        if self.find_by_name(name).await?.is_some() {
            return Err(AppError::Conflict("Department already exists".to_string()));
        }

        let created: Department = self
            .supabase
            .insert("departments", json!({ "name": name, "description": description }))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => AppError::Conflict("Department already exists".to_string()),
                other => other.into(),
            })?;

        info!("Department {} created: {}", created.id, created.name);
        Ok(created)
    }

    /// Creates any default department that does not exist yet. Returns how
    /// many were inserted.
    pub async fn seed_defaults(&self) -> Result<usize, AppError> {
        let existing: Vec<String> = self.list().await?.into_iter().map(|d| d.name).collect();

        let missing: Vec<_> = DEFAULT_DEPARTMENTS
            .iter()
            .filter(|(name, _)| !existing.iter().any(|e| e.eq_ignore_ascii_case(name)))
            .map(|(name, description)| json!({ "name": name, "description": description }))
            .collect();

        if missing.is_empty() {
            debug!("Default departments already present");
            return Ok(0);
        }

        let created: Vec<Department> = self.supabase.insert_many("departments", missing).await?;
        info!("Seeded {} default departments", created.len());

        Ok(created.len())
    }
}

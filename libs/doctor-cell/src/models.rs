use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::DepartmentRef;
use shared_utils::accounts::AccountInfo;

// ==============================================================================
// DOCTOR PROFILE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub department_id: Option<Uuid>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub contact_number: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub account: Option<AccountInfo>,
    #[serde(default)]
    pub department: Option<DepartmentRef>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }

    /// Profiles without an embedded account are treated as inactive.
    pub fn is_active(&self) -> bool {
        self.account.as_ref().map(|a| a.is_active).unwrap_or(false)
    }

    /// Case-insensitive match on first/last name, username or department.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let contains = |value: &str| value.to_lowercase().contains(&needle);

        contains(&self.first_name)
            || contains(&self.last_name)
            || self.account.as_ref().is_some_and(|a| contains(&a.username))
            || self.department.as_ref().is_some_and(|d| contains(&d.name))
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDoctorRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department_id: Option<Uuid>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub contact_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctorRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department_id: Option<Uuid>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub contact_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchQuery {
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor() -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            first_name: "Meera".into(),
            last_name: "Nair".into(),
            department_id: None,
            experience_years: Some(12),
            qualifications: None,
            bio: None,
            contact_number: None,
            created_at: Utc::now(),
            account: Some(AccountInfo {
                username: "drmeera".into(),
                email: "meera@hospital.com".into(),
                is_active: true,
            }),
            department: Some(DepartmentRef { id: Uuid::new_v4(), name: "Cardiology".into() }),
        }
    }

    #[test]
    fn search_covers_name_username_and_department() {
        let doc = doctor();
        assert!(doc.matches("meera"));
        assert!(doc.matches("NAIR"));
        assert!(doc.matches("drmee"));
        assert!(doc.matches("cardio"));
        assert!(!doc.matches("oncology"));
        assert!(doc.matches("  "));
    }

    #[test]
    fn missing_account_means_inactive() {
        let mut doc = doctor();
        assert!(doc.is_active());
        doc.account = None;
        assert!(!doc.is_active());
    }
}

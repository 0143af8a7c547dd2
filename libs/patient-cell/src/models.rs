use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::accounts::AccountInfo;

// ==============================================================================
// PATIENT PROFILE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub medical_history: Option<String>,
    pub emergency_contact: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub account: Option<AccountInfo>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let born = self.date_of_birth?;
        let mut years = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    pub fn is_active(&self) -> bool {
        self.account.as_ref().map(|a| a.is_active).unwrap_or(false)
    }

    /// Case-insensitive match on first/last name, username or contact number.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let contains = |value: &str| value.to_lowercase().contains(&needle);

        contains(&self.first_name)
            || contains(&self.last_name)
            || self.account.as_ref().is_some_and(|a| contains(&a.username))
            || self.contact_number.as_deref().is_some_and(contains)
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Self-registration body. `role` is accepted only so that anything other
/// than `patient` can be refused.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPatientRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub medical_history: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientSearchQuery {
    pub search: Option<String>,
}

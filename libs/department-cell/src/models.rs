// libs/department-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A department as listed publicly, with the number of doctors in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentListing {
    #[serde(flatten)]
    pub department: Department,
    pub doctors_registered: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Departments created on first start.
pub const DEFAULT_DEPARTMENTS: [(&str, &str); 6] = [
    ("Cardiology", "Heart and cardiovascular care"),
    ("Oncology", "Cancer diagnosis and treatment"),
    ("General", "General medicine and primary care"),
    ("Pediatrics", "Care for infants, children and adolescents"),
    ("Orthopedics", "Bones, joints and musculoskeletal care"),
    ("Neurology", "Brain and nervous system disorders"),
];

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_doctors: u64,
    pub total_patients: u64,
    pub total_appointments: u64,
    pub upcoming_appointments: u64,
}

/// `?search=` for the doctor and patient directories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryQuery {
    pub search: Option<String>,
}

impl DirectoryQuery {
    /// Trimmed search term, empty when absent. Also the cache key suffix.
    pub fn term(&self) -> &str {
        self.search.as_deref().map(str::trim).unwrap_or_default()
    }
}

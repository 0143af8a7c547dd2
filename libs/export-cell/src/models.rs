use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExportError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportState {
    Pending,
    Progress,
    Success,
    Failure,
}

impl ExportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportState::Pending => "PENDING",
            ExportState::Progress => "PROGRESS",
            ExportState::Success => "SUCCESS",
            ExportState::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Success | ExportState::Failure)
    }

    pub fn can_transition_to(&self, next: ExportState) -> bool {
        matches!(
            (self, next),
            (ExportState::Pending, ExportState::Progress)
                | (ExportState::Pending, ExportState::Failure)
                | (ExportState::Progress, ExportState::Success)
                | (ExportState::Progress, ExportState::Failure)
        )
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CSV export of a patient's completed history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub task_id: Uuid,
    pub patient_id: Uuid,
    pub state: ExportState,
    pub status_message: Option<String>,
    pub csv: Option<String>,
    pub error: Option<String>,
    pub worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExportJob {
    pub fn new(patient_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            patient_id,
            state: ExportState::Pending,
            status_message: None,
            csv: None,
            error: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: ExportState) -> Result<(), ExportError> {
        if !self.state.can_transition_to(next) {
            return Err(ExportError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn start(&mut self, worker_id: &str) -> Result<(), ExportError> {
        self.transition(ExportState::Progress)?;
        self.worker_id = Some(worker_id.to_string());
        self.status_message = Some("Generating CSV export...".to_string());
        Ok(())
    }

    /// `csv` is `None` when the patient has no completed visits.
    pub fn succeed(&mut self, csv: Option<String>) -> Result<(), ExportError> {
        self.transition(ExportState::Success)?;
        self.status_message = None;
        self.csv = csv;
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ExportError> {
        self.transition(ExportState::Failure)?;
        self.status_message = None;
        self.error = Some(error.into());
        Ok(())
    }

    pub fn owned_by(&self, patient_id: Uuid) -> bool {
        self.patient_id == patient_id
    }

    /// `patient_history_{patient}_{first 8 chars of task id}.csv`
    pub fn file_name(&self) -> String {
        let task = self.task_id.to_string();
        format!("patient_history_{}_{}.csv", self.patient_id, &task[..8])
    }
}

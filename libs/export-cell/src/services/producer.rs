use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::ExportError;
use crate::models::ExportJob;
use crate::services::store::JobStore;

pub struct ExportProducer {
    store: Arc<dyn JobStore>,
}

impl ExportProducer {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn request_export(&self, patient_id: Uuid) -> Result<ExportJob, ExportError> {
        let job = ExportJob::new(patient_id);
        self.store.enqueue(&job).await?;

        info!("History export {} queued for patient {}", job.task_id, patient_id);
        Ok(job)
    }

    /// The job, if it exists and belongs to `patient_id`.
    pub async fn status(&self, patient_id: Uuid, task_id: Uuid) -> Result<ExportJob, ExportError> {
        match self.store.get(task_id).await? {
            Some(job) if job.owned_by(patient_id) => Ok(job),
            _ => Err(ExportError::JobNotFound(task_id)),
        }
    }
}

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, instrument};

use appointment_cell::services::history::HistoryService;
use shared_database::SupabaseClient;

use crate::error::ExportError;
use crate::models::ExportJob;
use crate::services::csv_export::render_history;
use crate::services::store::JobStore;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Builds history CSVs for queued export jobs.
#[derive(Clone)]
pub struct ExportWorker {
    store: Arc<dyn JobStore>,
    history: HistoryService,
}

impl ExportWorker {
    pub fn new(store: Arc<dyn JobStore>, supabase: SupabaseClient) -> Self {
        Self {
            store,
            history: HistoryService::new(supabase),
        }
    }

    /// Starts `count` independent worker loops.
    pub fn spawn(&self, count: usize) -> Vec<JoinHandle<()>> {
        info!("Starting {} export workers", count);

        (0..count)
            .map(|i| {
                let worker = self.clone();
                tokio::spawn(async move { worker.run(format!("export-worker-{}", i)).await })
            })
            .collect()
    }

    async fn run(&self, worker_name: String) {
        debug!("Worker loop started: {}", worker_name);

        loop {
            match self.store.next_job().await {
                Ok(Some(job)) => {
                    if let Err(e) = self.process(job, &worker_name).await {
                        error!("Worker {} failed to process export: {}", worker_name, e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Worker {} failed to dequeue export: {}", worker_name, e);
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// Runs one job to a terminal state and stores the outcome.
    #[instrument(skip(self, job), fields(task_id = %job.task_id))]
    pub async fn process(&self, mut job: ExportJob, worker_name: &str) -> Result<ExportJob, ExportError> {
        job.start(worker_name)?;
        self.store.save(&job).await?;

        match self.build_csv(&job).await {
            Ok(csv) => {
                info!("Export {} finished ({} bytes)", job.task_id, csv.as_ref().map_or(0, String::len));
                job.succeed(csv)?;
            }
            Err(e) => {
                error!("Export {} failed: {}", job.task_id, e);
                job.fail(e.to_string())?;
            }
        }

        self.store.save(&job).await?;
        Ok(job)
    }

    async fn build_csv(&self, job: &ExportJob) -> Result<Option<String>, ExportError> {
        let visits = self.history.completed_history(job.patient_id, None).await?;
        render_history(&visits)
    }
}

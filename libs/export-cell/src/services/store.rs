use std::sync::Arc;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_cache::CacheClient;

use crate::error::ExportError;
use crate::models::ExportJob;

pub const PENDING_QUEUE: &str = "export_queue:pending";
pub const PROCESSING_QUEUE: &str = "export_queue:processing";
pub const JOB_TTL_SECS: i64 = 7 * 24 * 60 * 60;

pub fn job_key(task_id: Uuid) -> String {
    format!("export_job:{}", task_id)
}

/// Persistence and hand-off for export jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores a new job and makes it visible to workers.
    async fn enqueue(&self, job: &ExportJob) -> Result<(), ExportError>;

    /// Waits briefly for the next pending job; `None` on timeout.
    async fn next_job(&self) -> Result<Option<ExportJob>, ExportError>;

    async fn get(&self, task_id: Uuid) -> Result<Option<ExportJob>, ExportError>;

    /// Writes the job back. Terminal jobs leave the processing list.
    async fn save(&self, job: &ExportJob) -> Result<(), ExportError>;
}

/// Handle passed to the export routes. Empty when no Redis is configured.
#[derive(Clone, Default)]
pub struct ExportQueue(Option<Arc<dyn JobStore>>);

impl ExportQueue {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self(Some(store))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }

    /// Shares the cache's Redis pool when there is one.
    pub fn from_cache(cache: &CacheClient) -> Self {
        match cache.pool() {
            Some(pool) => Self::new(Arc::new(RedisJobStore::new(pool.clone()))),
            None => Self::unavailable(),
        }
    }

    pub fn store(&self) -> Result<Arc<dyn JobStore>, ExportError> {
        self.0.clone().ok_or(ExportError::Unavailable)
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }
}

/// Job hashes `export_job:{id}` plus a pending and a processing list.
pub struct RedisJobStore {
    pool: Pool,
    block_timeout_secs: f64,
}

impl RedisJobStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool, block_timeout_secs: 1.0 }
    }

    async fn connection(&self) -> Result<Connection, ExportError> {
        self.pool.get().await.map_err(|e| ExportError::Pool(e.to_string()))
    }

    async fn write(&self, conn: &mut Connection, job: &ExportJob) -> Result<(), ExportError> {
        let key = job_key(job.task_id);
        let data = serde_json::to_string(job)?;
        let patient_id = job.patient_id.to_string();
        let updated_at = job.updated_at.to_rfc3339();

        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("data", data.as_str()),
                    ("state", job.state.as_str()),
                    ("patient_id", patient_id.as_str()),
                    ("updated_at", updated_at.as_str()),
                ],
            )
            .await?;
        let _: () = conn.expire(&key, JOB_TTL_SECS as _).await?;
        Ok(())
    }

    async fn load(&self, conn: &mut Connection, task_id: Uuid) -> Result<Option<ExportJob>, ExportError> {
        let data: Option<String> = conn.hget(job_key(task_id), "data").await?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn enqueue(&self, job: &ExportJob) -> Result<(), ExportError> {
        let mut conn = self.connection().await?;
        self.write(&mut conn, job).await?;

        let _: () = conn.lpush(PENDING_QUEUE, job.task_id.to_string()).await?;
        debug!("Export job {} enqueued", job.task_id);
        Ok(())
    }

    async fn next_job(&self) -> Result<Option<ExportJob>, ExportError> {
        let mut conn = self.connection().await?;

        let popped: Option<String> = conn
            .brpoplpush(PENDING_QUEUE, PROCESSING_QUEUE, self.block_timeout_secs)
            .await?;
        let Some(raw_id) = popped else {
            return Ok(None);
        };

        let task_id = match Uuid::parse_str(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                warn!("Dropping malformed export queue entry {}: {}", raw_id, e);
                let _: () = conn.lrem(PROCESSING_QUEUE, 1, &raw_id).await?;
                return Ok(None);
            }
        };

        let job = self.load(&mut conn, task_id).await?;
        if job.is_none() {
            warn!("Export job {} expired before processing", task_id);
            let _: () = conn.lrem(PROCESSING_QUEUE, 1, &raw_id).await?;
        }
        Ok(job)
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<ExportJob>, ExportError> {
        let mut conn = self.connection().await?;
        self.load(&mut conn, task_id).await
    }

    async fn save(&self, job: &ExportJob) -> Result<(), ExportError> {
        let mut conn = self.connection().await?;
        self.write(&mut conn, job).await?;

        if job.state.is_terminal() {
            let _: () = conn.lrem(PROCESSING_QUEUE, 1, job.task_id.to_string()).await?;
        }
        Ok(())
    }
}

// =====================================================================================
// SHARED CACHE - BEST-EFFORT REDIS WRAPPER
// =====================================================================================

use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

pub const DEFAULT_TTL_SECS: u64 = 300;
pub const DEPARTMENTS_TTL_SECS: u64 = 600;

/// Cache key layout shared by every cell.
pub mod keys {
    pub const ADMIN_DASHBOARD: &str = "admin:dashboard:stats";
    pub const ADMIN_DOCTORS_PATTERN: &str = "admin:doctors:*";
    pub const ADMIN_PATIENTS_PATTERN: &str = "admin:patients:*";
    pub const ADMIN_APPOINTMENTS_PATTERN: &str = "admin:appointments:*";
    pub const DEPARTMENTS: &str = "departments:all";
    pub const DOCTOR_SEARCH_PATTERN: &str = "patient:doctors:search:*";

    pub fn admin_doctors(search: &str) -> String {
        format!("admin:doctors:list:{}", search)
    }

    pub fn admin_patients(search: &str) -> String {
        format!("admin:patients:list:{}", search)
    }

    pub fn admin_appointments(status: &str, upcoming: bool) -> String {
        format!("admin:appointments:{}:{}", status, upcoming)
    }

    pub fn patient_history(patient_id: &str) -> String {
        format!("patient:{}:history", patient_id)
    }

    pub fn doctor_search(query: &str) -> String {
        format!("patient:doctors:search:{}", query.to_lowercase())
    }
}

/// Optional Redis cache. Every operation swallows failures: with no Redis
/// configured or reachable, reads miss and writes are dropped.
#[derive(Clone, Default)]
pub struct CacheClient {
    pool: Option<Pool>,
}

impl CacheClient {
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    pub async fn connect(config: &AppConfig) -> Self {
        let Some(redis_url) = config.redis_url.clone() else {
            info!("Cache disabled: REDIS_URL not configured");
            return Self::disabled();
        };

        let pool = match Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1)) {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Failed to create Redis pool, cache disabled: {}", e);
                return Self::disabled();
            }
        };

        match pool.get().await {
            Ok(mut conn) => {
                let ping: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
                if let Err(e) = ping {
                    warn!("Redis PING failed, cache disabled: {}", e);
                    return Self::disabled();
                }
            }
            Err(e) => {
                warn!("Failed to connect to Redis, cache disabled: {}", e);
                return Self::disabled();
            }
        }

        info!("Redis cache initialized successfully");
        Self { pool: Some(pool) }
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// The underlying pool, for services that need Redis beyond caching.
    pub fn pool(&self) -> Option<&Pool> {
        self.pool.as_ref()
    }

    async fn connection(&self) -> Option<Connection> {
        let pool = self.pool.as_ref()?;
        match pool.get().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!("Cache connection unavailable: {}", e);
                None
            }
        }
    }

    pub async fn get<T>(&self, key: &str) -> Option<T>
    where T: DeserializeOwned {
        let mut conn = self.connection().await?;

        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache get failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw?) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T>(&self, key: &str, value: &T, ttl_secs: u64)
    where T: Serialize {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Cache serialization failed for {}: {}", key, e);
                return;
            }
        };

        let result: redis::RedisResult<()> = redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            warn!("Cache set failed for {}: {}", key, e);
        }
    }

    pub async fn delete(&self, key: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let result: redis::RedisResult<()> = conn.del(key).await;
        if let Err(e) = result {
            warn!("Cache delete failed for {}: {}", key, e);
        }
    }

    pub async fn clear_pattern(&self, pattern: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let keys: Vec<String> = match conn.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Cache key scan failed for {}: {}", pattern, e);
                return;
            }
        };

        if keys.is_empty() {
            return;
        }

        let result: redis::RedisResult<()> = conn.del(&keys).await;
        match result {
            Ok(()) => debug!("Cleared {} cache keys matching {}", keys.len(), pattern),
            Err(e) => warn!("Cache pattern delete failed for {}: {}", pattern, e),
        }
    }

    /// Drops every view derived from a patient's appointments.
    pub async fn invalidate_appointments(&self, patient_id: &str) {
        self.clear_pattern(keys::ADMIN_APPOINTMENTS_PATTERN).await;
        self.delete(keys::ADMIN_DASHBOARD).await;
        self.delete(&keys::patient_history(patient_id)).await;
    }
}

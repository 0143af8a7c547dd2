use std::sync::Arc;

use shared_cache::CacheClient;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

/// Shared handler state: configuration, store client and cache.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SupabaseClient,
    pub cache: CacheClient,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, cache: CacheClient) -> Self {
        let db = SupabaseClient::new(&config);
        Self { config, db, cache }
    }
}

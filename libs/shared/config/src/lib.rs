use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_service_key: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub redis_url: Option<String>,
    pub admin_email: String,
    pub admin_password: String,
    pub bind_addr: String,
    pub export_workers: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            database_service_key: env::var("DATABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            jwt_ttl_hours: env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@hospital.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_PASSWORD not set, using default seed password");
                    "admin123".to_string()
                }),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            export_workers: env::var("EXPORT_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_cache_configured() {
            warn!("REDIS_URL not set - caching and background exports are disabled");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !self.database_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_cache_configured(&self) -> bool {
        self.redis_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            database_url: "http://localhost:54321".to_string(),
            database_service_key: "service-key".to_string(),
            jwt_secret: "secret".to_string(),
            jwt_ttl_hours: 24,
            redis_url: None,
            admin_email: "admin@hospital.com".to_string(),
            admin_password: "admin123".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            export_workers: 1,
        }
    }

    #[test]
    fn configured_requires_database_and_secret() {
        assert!(base().is_configured());

        let mut config = base();
        config.jwt_secret.clear();
        assert!(!config.is_configured());
    }

    #[test]
    fn cache_is_optional() {
        let mut config = base();
        assert!(!config.is_cache_configured());

        config.redis_url = Some("redis://localhost:6379".to_string());
        assert!(config.is_cache_configured());
    }
}

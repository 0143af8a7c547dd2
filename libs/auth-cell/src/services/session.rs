use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::DoctorService;
use patient_cell::PatientService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::accounts::{Account, AccountService};
use shared_utils::jwt::issue_token;
use shared_utils::password::verify_password;

use crate::models::LoginResponse;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Credential checks, token issuance and role-specific profiles.
pub struct SessionService {
    config: Arc<AppConfig>,
    accounts: AccountService,
    doctors: DoctorService,
    patients: PatientService,
}

impl SessionService {
    pub fn new(config: Arc<AppConfig>, supabase: SupabaseClient) -> Self {
        Self {
            config,
            accounts: AccountService::new(supabase.clone()),
            doctors: DoctorService::new(supabase.clone()),
            patients: PatientService::new(supabase),
        }
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<LoginResponse, AppError> {
        let credentials = self
            .accounts
            .find_credentials(login)
            .await?
            .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

        let matches = verify_password(password, &credentials.password_hash).unwrap_or_else(|e| {
            warn!("Unreadable password hash for account {}: {}", credentials.id, e);
            false
        });
        if !matches {
            debug!("Password mismatch for {}", login);
            return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        if !credentials.is_active {
            return Err(AppError::Forbidden("Account is blacklisted. Please contact admin.".to_string()));
        }

        let access_token = issue_token(
            credentials.id,
            Some(&credentials.email),
            Some(&credentials.username),
            credentials.role,
            &self.config.jwt_secret,
            self.config.jwt_ttl_hours,
        )
        .map_err(AppError::Internal)?;

        let user = self.profile_for(credentials.id, credentials.role).await?;

        info!("{} {} logged in", credentials.role, credentials.id);
        Ok(LoginResponse {
            message: "Login successful".to_string(),
            access_token,
            user,
        })
    }

    /// The profile row matching the account's role, falling back to the
    /// account itself.
    pub async fn profile(&self, user_id: Uuid) -> Result<Value, AppError> {
        let account = self
            .accounts
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.profile_for(account.id, account.role).await
    }

    async fn profile_for(&self, user_id: Uuid, role: Role) -> Result<Value, AppError> {
        let profile = match role {
            Role::Doctor => self.doctors.get(user_id).await?.map(|d| json!(d)),
            Role::Patient => self.patients.get(user_id).await?.map(|p| json!(p)),
            Role::Admin => None,
        };

        match profile {
            Some(profile) => Ok(profile),
            None => self.account_json(user_id).await,
        }
    }

    async fn account_json(&self, user_id: Uuid) -> Result<Value, AppError> {
        let account: Account = self
            .accounts
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(json!(account))
    }
}

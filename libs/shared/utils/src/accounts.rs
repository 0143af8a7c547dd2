use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};
use shared_models::auth::Role;
use shared_models::error::AppError;

use crate::password::hash_password;

const ACCOUNT_COLUMNS: &str = "id,username,email,role,is_active,created_at";

/// A row of the `users` table without its password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The subset of an account embedded into profile rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountInfo {
    pub username: String,
    pub email: String,
    pub is_active: bool,
}

/// Login lookup result. Never serialized back to clients.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub password_hash: String,
}

pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
}

#[derive(Clone)]
pub struct AccountService {
    supabase: SupabaseClient,
}

impl AccountService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let path = format!("/rest/v1/users?id=eq.{}&select={}", id, ACCOUNT_COLUMNS);
        Ok(self.supabase.select_one(&path).await?)
    }

    async fn find_by(&self, column: &str, value: &str) -> Result<Option<Credentials>, DbError> {
        let path = format!(
            "/rest/v1/users?{}=eq.{}&select={},password_hash&limit=1",
            column,
            urlencoding::encode(value),
            ACCOUNT_COLUMNS
        );
        self.supabase.select_one(&path).await
    }

    /// Matches on username first, then on email.
    pub async fn find_credentials(&self, login: &str) -> Result<Option<Credentials>, AppError> {
        if let Some(found) = self.find_by("username", login).await? {
            return Ok(Some(found));
        }
        Ok(self.find_by("email", login).await?)
    }

    async fn taken_by_other(&self, column: &str, value: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let mut filter = format!("{}=eq.{}", column, urlencoding::encode(value));
        if let Some(id) = exclude {
            filter.push_str(&format!("&id=neq.{}", id));
        }
        Ok(self.supabase.count("users", &filter).await? > 0)
    }

    /// 400 `Username already exists` / `Email already exists` when another
    /// account holds either value.
    pub async fn ensure_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(username) = username {
            if self.taken_by_other("username", username, exclude).await? {
                return Err(AppError::BadRequest("Username already exists".to_string()));
            }
        }
        if let Some(email) = email {
            if self.taken_by_other("email", email, exclude).await? {
                return Err(AppError::BadRequest("Email already exists".to_string()));
            }
        }
        Ok(())
    }

    pub async fn create(&self, new: NewAccount<'_>) -> Result<Account, AppError> {
        let password_hash = hash_password(new.password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        let body = json!({
            "username": new.username,
            "email": new.email,
            "password_hash": password_hash,
            "role": new.role,
            "is_active": true
        });

        let account: Account = self.supabase.insert("users", body).await.map_err(|e| match e {
            DbError::Conflict(_) => AppError::BadRequest("Username or email already exists".to_string()),
            other => other.into(),
        })?;

        info!("Created {} account {} ({})", account.role, account.id, account.username);
        Ok(account)
    }

    /// Applies username/email changes after checking uniqueness against
    /// every other account.
    pub async fn update_identity(
        &self,
        id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), AppError> {
        let mut patch = Map::new();
        if let Some(username) = username {
            patch.insert("username".to_string(), Value::String(username.to_string()));
        }
        if let Some(email) = email {
            patch.insert("email".to_string(), Value::String(email.to_string()));
        }
        if patch.is_empty() {
            return Ok(());
        }

        self.ensure_unique(username, email, Some(id)).await?;

        let updated: Vec<Account> = self
            .supabase
            .update("users", &format!("id=eq.{}", id), Value::Object(patch))
            .await?;

        if updated.is_empty() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Blacklists (`false`) or reinstates (`true`) an account.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Account, AppError> {
        let updated: Vec<Account> = self
            .supabase
            .update("users", &format!("id=eq.{}", id), json!({ "is_active": active }))
            .await?;

        let account = updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!("Account {} active={}", id, active);
        Ok(account)
    }

    /// Compensation for a profile insert that failed after the account was created.
    pub async fn remove(&self, id: Uuid) {
        if let Err(e) = self.supabase.delete("users", &format!("id=eq.{}", id)).await {
            warn!("Failed to roll back account {}: {}", id, e);
        } else {
            debug!("Rolled back account {}", id);
        }
    }

    /// Creates the configured admin account unless an admin already exists.
    pub async fn ensure_admin(&self, config: &AppConfig) -> Result<(), AppError> {
        let admins = self
            .supabase
            .count("users", &format!("role=eq.{}", Role::Admin.as_str()))
            .await?;
        if admins > 0 {
            debug!("Admin account present");
            return Ok(());
        }

        let username = config
            .admin_email
            .split('@')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("admin");

        self.create(NewAccount {
            username,
            email: &config.admin_email,
            password: &config.admin_password,
            role: Role::Admin,
        })
        .await?;

        info!("Bootstrapped admin account {}", config.admin_email);
        Ok(())
    }
}

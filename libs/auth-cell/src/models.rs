use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `username` may also be the account's email.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub user: Value,
}

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_cache::CacheClient;
use shared_config::AppConfig;
use shared_models::auth::{Role, User};

use crate::jwt::issue_token;
use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_url: "http://localhost:54321".to_string(),
            database_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the store client at a mock server.
    pub fn with_database_url(url: &str) -> Self {
        Self {
            database_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_service_key: self.database_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_ttl_hours: 24,
            redis_url: None,
            admin_email: "admin@hospital.com".to_string(),
            admin_password: "admin123".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            export_workers: 1,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }

    /// State with the cache disabled.
    pub fn to_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(self.to_arc(), CacheClient::disabled()))
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", Role::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        let username = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username,
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: Some(self.email.clone()),
            username: Some(self.username.clone()),
            role: self.role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(
            user.id,
            Some(&user.email),
            Some(&user.username),
            user.role,
            secret,
            exp_hours.unwrap_or(24),
        )
        .expect("test secret is not empty")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }
}

/// PostgREST row fixtures.
pub struct MockRows;

impl MockRows {
    pub fn user_row(id: Uuid, username: &str, email: &str, role: Role, password_hash: &str, is_active: bool) -> Value {
        json!({
            "id": id,
            "username": username,
            "email": email,
            "role": role.as_str(),
            "password_hash": password_hash,
            "is_active": is_active,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn department_row(id: Uuid, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": format!("{} department", name),
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn doctor_row(id: Uuid, first_name: &str, last_name: &str, department: Option<(Uuid, &str)>, is_active: bool) -> Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": last_name,
            "department_id": department.map(|(id, _)| id),
            "experience_years": 10,
            "qualifications": "MBBS, MD",
            "bio": "Experienced physician",
            "contact_number": "9876543210",
            "created_at": Utc::now().to_rfc3339(),
            "account": {
                "username": first_name.to_lowercase(),
                "email": format!("{}@hospital.com", first_name.to_lowercase()),
                "is_active": is_active
            },
            "department": department.map(|(id, name)| json!({ "id": id, "name": name }))
        })
    }

    pub fn patient_row(id: Uuid, first_name: &str, last_name: &str, is_active: bool) -> Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": last_name,
            "date_of_birth": "1990-01-01",
            "contact_number": "9123456780",
            "address": "Patna",
            "gender": "Other",
            "blood_group": null,
            "medical_history": null,
            "emergency_contact": null,
            "created_at": Utc::now().to_rfc3339(),
            "account": {
                "username": first_name.to_lowercase(),
                "email": format!("{}@example.com", first_name.to_lowercase()),
                "is_active": is_active
            }
        })
    }

    pub fn availability_row(id: Uuid, doctor_id: Uuid, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Value {
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "available_date": date.format("%Y-%m-%d").to_string(),
            "start_time": start.format("%H:%M:%S").to_string(),
            "end_time": end.format("%H:%M:%S").to_string(),
            "is_available": true
        })
    }

    pub fn appointment_row(
        id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "scheduled_date": date.format("%Y-%m-%d").to_string(),
            "scheduled_time": time.format("%H:%M:%S").to_string(),
            "status": status,
            "reason": "Checkup",
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn treatment_row(id: Uuid, appointment_id: Uuid, diagnosis: &str) -> Value {
        json!({
            "id": id,
            "appointment_id": appointment_id,
            "visit_type": "In-person",
            "diagnosis": diagnosis,
            "prescription": "Rest",
            "medicines": "Paracetamol",
            "tests_done": "",
            "notes": "",
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn unique_violation(constraint: &str) -> Value {
        json!({
            "code": "23505",
            "message": format!("duplicate key value violates unique constraint \"{}\"", constraint),
            "details": null,
            "hint": null
        })
    }
}

// libs/department-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::debug;

use shared_cache::{keys, DEPARTMENTS_TTL_SECS};
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{CreateDepartmentRequest, DepartmentListing};
use crate::services::department::DepartmentService;

/// Public department directory with doctor counts.
pub async fn list_departments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DepartmentListing>>, AppError> {
    if let Some(cached) = state.cache.get::<Vec<DepartmentListing>>(keys::DEPARTMENTS).await {
        debug!("Departments served from cache");
        return Ok(Json(cached));
    }

    let departments = DepartmentService::new(state.db.clone()).list_with_counts().await?;
    state.cache.set(keys::DEPARTMENTS, &departments, DEPARTMENTS_TTL_SECS).await;

    Ok(Json(departments))
}

pub async fn create_department(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let department = DepartmentService::new(state.db.clone()).create(request).await?;

    state.cache.delete(keys::DEPARTMENTS).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Department created successfully",
            "department": department
        })),
    ))
}

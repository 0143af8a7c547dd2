use std::sync::Arc;

use axum::{routing::get, Router};

use admin_cell::router::admin_routes;
use auth_cell::router::auth_routes;
use department_cell::router::department_routes;
use doctor_cell::router::doctor_routes;
use export_cell::router::export_routes;
use export_cell::ExportQueue;
use patient_cell::router::patient_routes;
use shared_utils::AppState;

pub fn create_router(state: Arc<AppState>, queue: ExportQueue) -> Router {
    Router::new()
        .route("/", get(|| async { "CuraNet API is running!" }))
        .nest("/api/auth", auth_routes(state.clone()))
        .nest("/api/departments", department_routes(state.clone()))
        .nest("/api/admin", admin_routes(state.clone()))
        .nest("/api/doctor", doctor_routes(state.clone()))
        .nest("/api/patient", patient_routes(state.clone()))
        .nest("/api/tasks", export_routes(state, queue))
}

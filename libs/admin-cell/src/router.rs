use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use department_cell::handlers::{create_department, list_departments};
use shared_models::auth::Role;
use shared_utils::extractor::{auth_middleware, require_role};
use shared_utils::AppState;

use crate::handlers;

/// Administration surface. Every route requires an admin token.
pub fn admin_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route("/doctors", get(handlers::list_doctors).post(handlers::create_doctor))
        .route(
            "/doctors/{doctor_id}",
            get(handlers::get_doctor)
                .put(handlers::update_doctor)
                .delete(handlers::blacklist_doctor),
        )
        .route("/doctors/{doctor_id}/activate", post(handlers::activate_doctor))
        .route("/patients", get(handlers::list_patients))
        .route(
            "/patients/{patient_id}",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::blacklist_patient),
        )
        .route("/patients/{patient_id}/activate", post(handlers::activate_patient))
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/{appointment_id}/history", get(handlers::appointment_history))
        .route("/departments", get(list_departments).post(create_department))
        .layer(middleware::from_fn_with_state(Role::Admin, require_role))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use department_cell::handlers::list_departments;
use shared_models::auth::Role;
use shared_utils::extractor::{auth_middleware, require_role};
use shared_utils::AppState;

use crate::handlers;

/// Patient portal. Every route requires a patient token.
pub fn patient_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route("/profile", get(handlers::get_profile).put(handlers::update_profile))
        .route("/departments", get(list_departments))
        .route("/departments/{department_id}/doctors", get(handlers::department_doctors))
        .route("/doctors/search", get(handlers::search_doctors))
        .route("/doctors/{doctor_id}", get(handlers::doctor_details))
        .route("/doctors/{doctor_id}/availability", get(handlers::doctor_availability))
        .route("/appointments", get(handlers::list_appointments).post(handlers::book_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/history", get(handlers::history))
        .layer(middleware::from_fn_with_state(Role::Patient, require_role))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

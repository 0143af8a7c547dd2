use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_models::auth::Role;
use shared_utils::extractor::{auth_middleware, require_role};
use shared_utils::AppState;

use crate::handlers;

/// Doctor portal. Every route requires a doctor token.
pub fn doctor_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{appointment_id}/history", put(handlers::update_history))
        .route("/patients", get(handlers::assigned_patients))
        .route("/patients/{patient_id}/history", get(handlers::patient_history))
        .route("/availability", get(handlers::get_availability).post(handlers::set_availability))
        .layer(middleware::from_fn_with_state(Role::Doctor, require_role))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

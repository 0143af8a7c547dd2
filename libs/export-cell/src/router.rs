use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};

use shared_models::auth::Role;
use shared_utils::extractor::{auth_middleware, require_role};
use shared_utils::AppState;

use crate::handlers;
use crate::services::store::ExportQueue;

/// History export jobs for the calling patient.
pub fn export_routes(state: Arc<AppState>, queue: ExportQueue) -> Router {
    Router::new()
        .route("/export-history", post(handlers::start_export))
        .route("/export-history/{task_id}", get(handlers::export_status))
        .layer(Extension(queue))
        .layer(middleware::from_fn_with_state(Role::Patient, require_role))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

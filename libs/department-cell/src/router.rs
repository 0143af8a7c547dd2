// libs/department-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_utils::AppState;

use crate::handlers;

/// Public routes; the admin create route is mounted by the admin cell.
pub fn department_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_departments))
        .with_state(state)
}

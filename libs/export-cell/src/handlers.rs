// libs/export-cell/src/handlers.rs
use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::Path;

use crate::models::{ExportJob, ExportState};
use crate::services::producer::ExportProducer;
use crate::services::store::ExportQueue;

pub async fn start_export(
    Extension(queue): Extension<ExportQueue>,
    Extension(user): Extension<User>,
) -> Result<Response, AppError> {
    let job = ExportProducer::new(queue.store()?).request_export(user.id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "CSV export started",
            "task_id": job.task_id,
            "status": "processing"
        })),
    )
        .into_response())
}

/// Progress of an export, or the CSV itself once it is ready.
pub async fn export_status(
    Extension(queue): Extension<ExportQueue>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let job = ExportProducer::new(queue.store()?).status(user.id, task_id).await?;
    Ok(render_job(job))
}

fn render_job(job: ExportJob) -> Response {
    let state = job.state.as_str();

    match job.state {
        ExportState::Pending => Json(json!({
            "state": state,
            "status": "Waiting to be processed..."
        }))
        .into_response(),
        ExportState::Progress => Json(json!({
            "state": state,
            "status": job.status_message.as_deref().unwrap_or("Processing...")
        }))
        .into_response(),
        ExportState::Success => {
            let file_name = job.file_name();
            match job.csv {
                Some(csv) => (
                    [
                        (header::CONTENT_TYPE, "text/csv".to_string()),
                        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
                    ],
                    csv,
                )
                    .into_response(),
                None => Json(json!({
                    "state": state,
                    "status": "Export completed but no data found"
                }))
                .into_response(),
            }
        }
        ExportState::Failure => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "state": state,
                "status": "Export failed",
                "error": job.error.as_deref().unwrap_or("Unknown error")
            })),
        )
            .into_response(),
    }
}

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::ExportError;
pub use models::*;
pub use services::store::{ExportQueue, JobStore, RedisJobStore};
pub use services::worker::ExportWorker;

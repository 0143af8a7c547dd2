use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curanet_api::router::create_router;
use department_cell::services::department::DepartmentService;
use export_cell::{ExportQueue, ExportWorker};
use shared_cache::CacheClient;
use shared_config::AppConfig;
use shared_utils::accounts::AccountService;
use shared_utils::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CuraNet API server");

    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("Store configuration incomplete; requests touching the database will fail");
    }

    let cache = CacheClient::connect(&config).await;
    let state = Arc::new(AppState::new(config.clone(), cache.clone()));

    bootstrap(&state).await;

    let queue = ExportQueue::from_cache(&cache);
    if let Ok(store) = queue.store() {
        ExportWorker::new(store, state.db.clone()).spawn(config.export_workers);
    } else {
        warn!("Redis unavailable: history exports are disabled");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state, queue)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Seeds default departments and the admin account. Failures are logged so
/// the server still starts against a store that is not reachable yet.
async fn bootstrap(state: &AppState) {
    match DepartmentService::new(state.db.clone()).seed_defaults().await {
        Ok(0) => {}
        Ok(created) => info!("Seeded {} departments", created),
        Err(e) => warn!("Department seeding skipped: {}", e),
    }

    if let Err(e) = AccountService::new(state.db.clone()).ensure_admin(&state.config).await {
        warn!("Admin bootstrap skipped: {}", e);
    }
}

mod api;
mod config;
mod db;
mod error;
mod media;
mod storage;
mod web_ui;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::MediaConfig;
use storage::{LocalStorage, StorageBackend};

/// Upload size limit for asset resources (1GB)
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_assets=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MediaConfig::from_env().expect("Failed to load configuration");

    // Initialize database
    let db_path = config.db_path();
    let db = db::init_database(&db_path)
        .await
        .expect("Failed to initialize database");
    tracing::info!("Database initialized at {:?}", db_path);

    let storage_path = config.storage_path();
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(storage_path.clone()));
    tracing::info!("Storing resources under {:?}", storage_path);

    for attachment in &config.attachments {
        tracing::info!(
            "Attachment field {}.{} ({:?})",
            attachment.owner_type,
            attachment.field,
            attachment.sharing
        );
    }

    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(db, storage, config));

    let app = Router::new()
        // JSON endpoints for content records and health
        .merge(api::api_router())
        // Asset pages (HTML, XML and the inline upload widget)
        .merge(web_ui::router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Media server starting on http://{}", addr);
    tracing::info!("Assets: http://{}/assets", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app).await.expect("Server error");
}

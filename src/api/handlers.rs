use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;

use crate::config::MediaConfig;
use crate::media::{AssetLibrary, AttachmentRegistry};
use crate::storage::StorageBackend;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<MediaConfig>,
    /// Attachment fields declared in the configuration
    pub registry: AttachmentRegistry,
    pub library: AssetLibrary,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageBackend>, config: MediaConfig) -> Self {
        let registry = AttachmentRegistry::new(config.attachments.iter().cloned());
        let library = AssetLibrary::new(db.clone(), storage);
        Self {
            db,
            config: Arc::new(config),
            registry,
            library,
        }
    }
}

pub async fn health() -> Response {
    let json = serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json.to_string(),
    )
        .into_response()
}

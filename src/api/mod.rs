pub mod contents;
pub mod format;
mod handlers;

use std::sync::Arc;
use axum::{routing::{get, post}, Router};

pub use handlers::{health, AppState};

/// JSON endpoints for content records and their attachment fields
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/contents", post(contents::create_record))
        .route(
            "/contents/:id/translations",
            get(contents::list_translations).post(contents::translate_record),
        )
        .route("/contents/:id/relations", get(contents::list_relations))
        .route("/contents/:id/media", get(contents::list_fields))
        .route(
            "/contents/:id/media/:field",
            get(contents::show_field)
                .put(contents::assign_field)
                .post(contents::attach_asset),
        )
        .route("/contents/:id/media/:field/:asset_id", get(contents::asset_name))
        .route("/relations", get(contents::search_relations))
}

//! Web UI route handlers.

mod asset_handlers;
mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::AppState;
use asset_handlers::{
    asset_resource, create_asset, destroy_asset, edit_asset, index, new_asset, search_assets,
    show_asset, update_asset,
};

/// Asset pages; every route also answers XML where it makes sense
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/assets", get(index).post(create_asset))
        .route("/assets/new", get(new_asset))
        .route("/assets/search", get(search_assets))
        .route(
            "/assets/:id",
            get(show_asset).post(update_asset).put(update_asset).delete(destroy_asset),
        )
        .route("/assets/:id/edit", get(edit_asset))
        .route("/assets/:id/delete", post(destroy_asset))
        .route("/assets/:id/resource", get(asset_resource))
}

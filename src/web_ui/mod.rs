//! Web UI Module
//!
//! HTML pages for browsing, uploading and editing assets, rendered from
//! templates embedded in the binary. The same handlers answer XML and
//! inline-widget requests.

pub mod filters;
mod routes;
mod templates;

use axum::Router;
use std::sync::Arc;

use crate::api::AppState;

/// Create the web UI router.
/// Mount this with `.merge(web_ui::router())` in main.rs
pub fn router() -> Router<Arc<AppState>> {
    routes::create_router()
}

//! Shared utilities and helper functions for web UI.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tera::Context;

use crate::error::ServerError;
use crate::web_ui::templates;

/// Helper to render a template
pub fn render_template(name: &str, context: &Context) -> Response {
    render_with_status(StatusCode::OK, name, context)
}

pub fn render_with_status(status: StatusCode, name: &str, context: &Context) -> Response {
    match templates::render(name, context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e)).into_response()
        }
    }
}

/// Helper to render an error page
pub fn render_error(status: StatusCode, message: &str) -> Response {
    let mut context = Context::new();
    context.insert("message", message);

    match templates::render("error.html", &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}

/// Error page for a failed request; internal details stay in the log
pub fn render_failure(error: &ServerError) -> Response {
    let status = error.status();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", error);
        return render_error(status, "Internal server error");
    }
    render_error(status, &error.to_string())
}

/// Format a file size for display
pub fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else if size < 1024 * 1024 * 1024 {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format seconds ago as human-readable string
pub fn format_time_ago(seconds: i64) -> String {
    if seconds < 0 {
        return "in the future".to_string();
    }
    if seconds < 60 {
        return "just now".to_string();
    }
    let units = [
        (60 * 60 * 24 * 365, "year"),
        (60 * 60 * 24 * 30, "month"),
        (60 * 60 * 24, "day"),
        (60 * 60, "hour"),
        (60, "minute"),
    ];
    for (unit, name) in units {
        let count = seconds / unit;
        if count > 0 {
            return format!("{} {}{} ago", count, name, if count == 1 { "" } else { "s" });
        }
    }
    "just now".to_string()
}

/// Format a Unix timestamp as a relative time string
pub fn format_relative_time(timestamp: i64) -> String {
    format_time_ago(crate::media::assets::now() - timestamp)
}

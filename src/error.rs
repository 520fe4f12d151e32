use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Asset not found: {0}")]
    AssetNotFound(i32),

    #[error("Content record not found: {0}")]
    RecordNotFound(i32),

    #[error("Unknown attachment field: {0}")]
    UnknownField(String),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Messages suitable for showing next to a form
    pub fn messages(&self) -> Vec<String> {
        match self {
            ServerError::Validation(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::AssetNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::UnknownField(_) => StatusCode::NOT_FOUND,
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Database(_)
            | ServerError::Storage(_)
            | ServerError::Template(_)
            | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

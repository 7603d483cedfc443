//! Application error types with Axum response mapping.
//!
//! Each variant maps to a specific HTTP status + JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::session::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session storage unavailable: {0}")]
    Storage(String),

    #[error("No affiliate attribution in session")]
    NoAttribution,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        tracing::error!("Session store error: {}", e);
        AppError::Storage(e.to_string())
    }
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, serde_json::Value) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({"error": msg})),
            AppError::Storage(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"error": "Session storage unavailable"}),
            ),
            AppError::NoAttribution => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"error": "No affiliate attribution in session", "tracked": false}),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": msg}))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, axum::Json(body)).into_response()
    }
}

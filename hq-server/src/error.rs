//! Error handling
//!
//! Routes answer failures with `{ "error": <fixed message> }`. The message is
//! chosen by the route; the status code by the kind of failure.

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Store errors, carrying the route's public message
    Store { message: &'static str, source: StoreError },

    // Request errors
    BadRequest(&'static str),
    Unauthorized(&'static str),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store { source, .. } => match source {
                StoreError::Connection(_) => StatusCode::INTERNAL_SERVER_ERROR,
                StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Store { message, source } => {
                tracing::error!("{}: {}", message, source);
                *message
            }
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) => *msg,
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

/// Attach a route's public message to a store failure
pub trait StoreResultExt<T> {
    fn or_fail(self, message: &'static str) -> AppResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn or_fail(self, message: &'static str) -> AppResult<T> {
        self.map_err(|source| AppError::Store { message, source })
    }
}

//! HTTP handlers

pub mod apps;
pub mod audit;
pub mod auth;
pub mod command;
pub mod gateways;
pub mod health;
pub mod logs;
pub mod policy;
pub mod stats;
pub mod system_config;
pub mod telemetry;

use axum::{extract::rejection::JsonRejection, Json};
use serde::Serialize;

use crate::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Unwrap a JSON body, answering a malformed one with the route's message
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>, message: &'static str) -> AppResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection);
            Err(AppError::BadRequest(message))
        }
    }
}

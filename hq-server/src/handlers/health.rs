//! Health check handler

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub db: &'static str,
}

/// Reports whether the store is reachable
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let timestamp = Utc::now().to_rfc3339();

    if state.store.check_connection().await {
        (
            StatusCode::OK,
            Json(HealthResponse { status: "HEALTHY", timestamp, db: "CONNECTED" }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "DEGRADED", timestamp, db: "DISCONNECTED" }),
        )
    }
}

//! System log handler

use axum::{extract::State, Json};

use crate::error::StoreResultExt;
use crate::models::{LogLevel, SystemLogEntry};
use crate::{AppResult, AppState};

const FETCH_FAILED: &str = "Failed to fetch system logs";

/// Newest first. The poll itself is recorded after the read, so it shows up
/// on the next poll rather than this one.
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<SystemLogEntry>>> {
    let logs = state.store.get_system_logs().await.or_fail(FETCH_FAILED)?;

    state
        .record(
            LogLevel::Debug,
            "POLL_SYNC",
            &format!("Log buffer accessed. Record count: {}", logs.len()),
        )
        .await;

    Ok(Json(logs))
}

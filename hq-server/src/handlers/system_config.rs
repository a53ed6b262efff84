//! Engine configuration handlers

use axum::{extract::{rejection::JsonRejection, State}, Json};

use crate::error::StoreResultExt;
use crate::handlers::{body, SuccessResponse};
use crate::models::{LogLevel, SystemConfig, UpdateConfigRequest};
use crate::{AppResult, AppState};

const FETCH_FAILED: &str = "Failed to fetch config";
const UPDATE_FAILED: &str = "Failed to update config";

pub async fn get(State(state): State<AppState>) -> AppResult<Json<SystemConfig>> {
    let config = state.store.get_system_config().await.or_fail(FETCH_FAILED)?;
    Ok(Json(config))
}

pub async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateConfigRequest>, JsonRejection>,
) -> AppResult<Json<SuccessResponse>> {
    let req = body(payload, UPDATE_FAILED)?;

    state
        .store
        .update_system_config(&req.key, &req.value)
        .await
        .or_fail(UPDATE_FAILED)?;

    state
        .record(
            LogLevel::Info,
            "SYSTEM",
            &format!("Configuration updated: {} = {}", req.key, req.value),
        )
        .await;

    Ok(SuccessResponse::ok())
}

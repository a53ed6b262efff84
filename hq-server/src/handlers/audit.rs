//! Audit ledger handler

use axum::{extract::State, Json};

use crate::error::StoreResultExt;
use crate::models::AuditLogEntry;
use crate::{AppResult, AppState};

const FETCH_FAILED: &str = "Failed to fetch audit logs";

/// Newest entries first
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<AuditLogEntry>>> {
    let logs = state.store.get_audit_logs().await.or_fail(FETCH_FAILED)?;
    Ok(Json(logs))
}

//! Sensor telemetry handlers
//!
//! Sensors POST a heartbeat every few seconds and receive policy updates and
//! queued commands in the reply. Alerts are posted as they happen.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::error::StoreResultExt;
use crate::handlers::body;
use crate::models::{
    HeartbeatRequest, HeartbeatResponse, LogLevel, ReportAlertRequest, ReportAlertResponse,
    SensorStatus, TelemetryEvent,
};
use crate::{AppError, AppResult, AppState};

const HEARTBEAT_FAILED: &str = "Failed to process heartbeat";
const SENSORS_FAILED: &str = "Failed to fetch sensors";
const ALERT_FAILED: &str = "Failed to store alert";
const ALERTS_FAILED: &str = "Failed to fetch alerts";

/// First address in `X-Forwarded-For`, if any
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

pub async fn heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> AppResult<Json<HeartbeatResponse>> {
    let req = body(payload, "Invalid JSON")?;
    if req.validate().is_err() {
        return Err(AppError::BadRequest("Missing ID or Hostname"));
    }

    let now_ms = Utc::now().timestamp_millis();
    let status = req.to_status(now_ms, forwarded_ip(&headers));
    tracing::debug!(sensor = %status.id, hostname = %status.hostname, "Heartbeat received");

    state.store.update_sensor(status).await.or_fail(HEARTBEAT_FAILED)?;

    let policy_version = state.store.get_policy_version().await.or_fail(HEARTBEAT_FAILED)?;
    let policies = if req.policy_version.as_deref() == Some(policy_version.as_str()) {
        None
    } else {
        Some(state.store.get_policies().await.or_fail(HEARTBEAT_FAILED)?)
    };
    // get_policies may have seeded the defaults, which moves the version
    let policy_version = match &policies {
        Some(_) => state.store.get_policy_version().await.or_fail(HEARTBEAT_FAILED)?,
        None => policy_version,
    };

    let commands = state.store.pop_commands(&req.id).await.or_fail(HEARTBEAT_FAILED)?;
    if !commands.is_empty() {
        tracing::info!(sensor = %req.id, count = commands.len(), "Delivering queued commands");
    }

    Ok(Json(HeartbeatResponse {
        policies,
        policy_version,
        commands,
    }))
}

pub async fn sensors(State(state): State<AppState>) -> AppResult<Json<Vec<SensorStatus>>> {
    state.record(LogLevel::Debug, "API", "GET /api/telemetry/heartbeat - 200 OK").await;
    let sensors = state.store.get_sensors().await.or_fail(SENSORS_FAILED)?;
    Ok(Json(sensors))
}

pub async fn report_alert(
    State(state): State<AppState>,
    payload: Result<Json<ReportAlertRequest>, JsonRejection>,
) -> AppResult<Json<ReportAlertResponse>> {
    let req = body(payload, "Invalid JSON")?;
    if req.validate().is_err() {
        return Err(AppError::BadRequest("Missing required fields"));
    }

    let event = req.into_event(Utc::now().timestamp_millis());
    let id = event.id.clone();
    tracing::info!(sensor = %event.sensor_id, kind = event.event_type.as_str(), "Alert received");

    state.store.add_alert(event).await.or_fail(ALERT_FAILED)?;

    Ok(Json(ReportAlertResponse { success: true, id }))
}

pub async fn alerts(State(state): State<AppState>) -> AppResult<Json<Vec<TelemetryEvent>>> {
    state.record(LogLevel::Debug, "API", "GET /api/telemetry/alert - 200 OK").await;
    let alerts = state.store.get_alerts().await.or_fail(ALERTS_FAILED)?;
    Ok(Json(alerts))
}

//! Remote command handler
//!
//! Queueing and auditing are two separate store writes. The queue write
//! decides the response; the audit write that follows is best effort, so a
//! command is delivered at most once even when its ledger entry is missing.

use axum::{extract::{rejection::JsonRejection, State}, Json};

use crate::error::StoreResultExt;
use crate::handlers::{body, SuccessResponse};
use crate::models::{LogLevel, QueueCommandRequest, Severity, ISOLATE};
use crate::{AppResult, AppState};

const QUEUE_FAILED: &str = "Failed to queue command";

pub fn command_severity(command_type: &str) -> Severity {
    if command_type == ISOLATE {
        Severity::Critical
    } else {
        Severity::Warn
    }
}

pub async fn queue(
    State(state): State<AppState>,
    payload: Result<Json<QueueCommandRequest>, JsonRejection>,
) -> AppResult<Json<SuccessResponse>> {
    let req = body(payload, QUEUE_FAILED)?;

    state
        .store
        .queue_command(&req.sensor_id, &req.command_type, req.payload.clone())
        .await
        .or_fail(QUEUE_FAILED)?;

    let action = format!("COMMAND_{}", req.command_type);
    let target = format!("sensor:{}", req.sensor_id);

    if let Err(e) = state
        .audit
        .log_audit_action(
            &state.actor,
            &action,
            &target,
            Some(req.payload),
            command_severity(&req.command_type),
        )
        .await
    {
        tracing::error!("Audit write failed for queued {} on {}: {}", action, target, e);
        state
            .record(
                LogLevel::Error,
                "AUDIT",
                &format!("Audit entry missing for {} on {}", action, target),
            )
            .await;
    }

    Ok(SuccessResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::test_support::{failing_app, memory_state, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn isolate_is_critical() {
        assert_eq!(command_severity("ISOLATE"), Severity::Critical);
        assert_eq!(command_severity("BLOCK_CLIPBOARD"), Severity::Warn);
    }

    #[tokio::test]
    async fn isolate_queues_then_audits_critical() {
        let (state, store) = memory_state();
        let app = crate::create_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/command",
            Some(json!({ "sensorId": "S1", "type": "ISOLATE", "payload": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let queued = store.pending_commands().await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].sensor_id, "S1");
        assert_eq!(queued[0].command_type, "ISOLATE");
        assert_eq!(queued[0].payload, json!({}));

        let audit = store.get_audit_logs().await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "COMMAND_ISOLATE");
        assert_eq!(audit[0].target_resource, "sensor:S1");
        assert_eq!(audit[0].actor_id, "SYS_ADMIN");
        assert_eq!(audit[0].actor_name, "ANALYST_01");
        assert_eq!(audit[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn other_commands_audit_as_warn() {
        let (state, store) = memory_state();
        let app = crate::create_router(state);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/command",
            Some(json!({ "sensorId": "S2", "type": "BLOCK_CLIPBOARD", "payload": { "on": true } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let audit = store.get_audit_logs().await.unwrap();
        assert_eq!(audit[0].action, "COMMAND_BLOCK_CLIPBOARD");
        assert_eq!(audit[0].severity, Severity::Warn);
        assert_eq!(audit[0].details, json!({ "on": true }));
    }

    #[tokio::test]
    async fn audit_failure_still_delivers_command() {
        let (state, store) = memory_state();
        store.fail_audit_writes();
        let app = crate::create_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/command",
            Some(json!({ "sensorId": "S1", "type": "ISOLATE", "payload": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        assert_eq!(store.pending_commands().await.len(), 1);
        assert!(store.get_audit_logs().await.unwrap().is_empty());

        let logs = store.get_system_logs().await.unwrap();
        assert_eq!(logs[0].log_type, "ERROR");
        assert_eq!(logs[0].component, "AUDIT");
        assert_eq!(logs[0].message, "Audit entry missing for COMMAND_ISOLATE on sensor:S1");
    }

    #[tokio::test]
    async fn queue_failure_is_500() {
        let (status, body) = send(
            &failing_app(),
            Method::POST,
            "/api/command",
            Some(json!({ "sensorId": "S1", "type": "ISOLATE", "payload": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to queue command" }));
    }
}

//! Policy handlers

use axum::{extract::{rejection::JsonRejection, State}, Json};

use crate::error::StoreResultExt;
use crate::handlers::{body, SuccessResponse};
use crate::models::{LogLevel, PolicyRule};
use crate::{AppResult, AppState};

const FETCH_FAILED: &str = "Failed to fetch policies";
const UPDATE_FAILED: &str = "Failed to update";

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<PolicyRule>>> {
    let policies = state.store.get_policies().await.or_fail(FETCH_FAILED)?;
    Ok(Json(policies))
}

/// Replace the whole rule set with the posted array.
/// Any failure, including an unreadable body, is written to the system log.
pub async fn update(
    State(state): State<AppState>,
    payload: Result<Json<Vec<PolicyRule>>, JsonRejection>,
) -> AppResult<Json<SuccessResponse>> {
    match replace_rules(&state, payload).await {
        Ok(count) => {
            state
                .record(
                    LogLevel::Info,
                    "POLICY_ENGINE",
                    &format!("Policy configuration updated. Total active rules: {}", count),
                )
                .await;
            Ok(SuccessResponse::ok())
        }
        Err(e) => {
            state
                .record(LogLevel::Error, "POLICY_ENGINE", "Failed to update policy configuration")
                .await;
            Err(e)
        }
    }
}

async fn replace_rules(
    state: &AppState,
    payload: Result<Json<Vec<PolicyRule>>, JsonRejection>,
) -> AppResult<usize> {
    let policies = body(payload, UPDATE_FAILED)?;
    let count = policies.len();
    state.store.update_policies(policies).await.or_fail(UPDATE_FAILED)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use crate::models::default_policies;
    use crate::store::Store;
    use crate::test_support::{failing_app, memory_app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn lists_current_rules() {
        let (app, store) = memory_app();
        let expected = serde_json::to_value(store.get_policies().await.unwrap()).unwrap();

        let (status, body) = send(&app, Method::GET, "/api/policy", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn post_forwards_exact_array() {
        let (app, store) = memory_app();
        let mut rules = default_policies();
        rules.truncate(2);
        let before = store.get_policy_version().await.unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/policy",
            Some(serde_json::to_value(&rules).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        assert_eq!(store.get_policies().await.unwrap(), rules);
        assert_ne!(store.get_policy_version().await.unwrap(), before);

        let logs = store.get_system_logs().await.unwrap();
        assert_eq!(logs[0].component, "POLICY_ENGINE");
        assert_eq!(logs[0].message, "Policy configuration updated. Total active rules: 2");
    }

    #[tokio::test]
    async fn store_failures_are_500() {
        let app = failing_app();

        let (status, body) = send(&app, Method::GET, "/api/policy", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch policies" }));

        let (status, body) = send(&app, Method::POST, "/api/policy", Some(json!([]))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to update" }));
    }

    #[tokio::test]
    async fn unreadable_rules_are_logged_as_errors() {
        let (app, store) = memory_app();
        let mut rule = serde_json::to_value(&default_policies()[0]).unwrap();
        rule["action"] = json!("WARN");

        let (status, body) = send(&app, Method::POST, "/api/policy", Some(json!([rule]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Failed to update" }));

        let logs = store.get_system_logs().await.unwrap();
        assert_eq!(logs[0].log_type, "ERROR");
        assert_eq!(logs[0].component, "POLICY_ENGINE");
        assert_eq!(logs[0].message, "Failed to update policy configuration");
    }
}

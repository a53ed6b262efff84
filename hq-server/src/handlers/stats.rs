//! Dashboard analytics handler

use axum::{extract::State, Json};

use crate::error::StoreResultExt;
use crate::models::{discovery, DashboardResponse, LogLevel};
use crate::{AppResult, AppState};

const FETCH_FAILED: &str = "Failed to fetch analytics";

pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardResponse>> {
    state
        .record(LogLevel::Debug, "API", "GET /api/stats - 200 OK")
        .await;

    state.store.seed_initial_apps().await.or_fail(FETCH_FAILED)?;

    let (stats, chart, apps) = tokio::try_join!(
        state.store.get_stats(),
        state.store.get_chart_data(),
        state.store.get_applications(),
    )
    .or_fail(FETCH_FAILED)?;

    Ok(Json(DashboardResponse {
        stats,
        chart,
        discovery: discovery(&apps),
    }))
}

#[cfg(test)]
mod tests {
    use crate::store::Store;
    use crate::test_support::{failing_app, memory_app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn seeds_inventory_and_reports() {
        let (app, store) = memory_app();

        let (status, body) = send(&app, Method::GET, "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chart"].as_array().unwrap().len(), 24);
        assert_eq!(body["stats"]["totalAgents"], 0);
        assert_eq!(
            body["discovery"],
            json!({ "sanctionedCount": 3, "unsanctionedCount": 2, "avgCCI": 70 })
        );

        assert_eq!(store.get_applications().await.unwrap().len(), 5);
        let logs = store.get_system_logs().await.unwrap();
        assert_eq!(logs[0].log_type, "DEBUG");
        assert_eq!(logs[0].component, "API");
        assert_eq!(logs[0].message, "GET /api/stats - 200 OK");
    }

    #[tokio::test]
    async fn store_failure_is_500() {
        let (status, body) = send(&failing_app(), Method::GET, "/api/stats", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch analytics" }));
    }
}

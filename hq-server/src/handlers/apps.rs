//! Application inventory handler

use axum::{extract::State, Json};

use crate::error::StoreResultExt;
use crate::models::Application;
use crate::{AppResult, AppState};

const FETCH_FAILED: &str = "Failed to fetch application inventory";

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Application>>> {
    let apps = state.store.get_applications().await.or_fail(FETCH_FAILED)?;
    Ok(Json(apps))
}

#[cfg(test)]
mod tests {
    use crate::store::Store;
    use crate::test_support::{failing_app, memory_app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn returns_inventory_unchanged() {
        let (app, store) = memory_app();
        store.seed_initial_apps().await.unwrap();
        let expected = serde_json::to_value(store.get_applications().await.unwrap()).unwrap();

        let (status, body) = send(&app, Method::GET, "/api/apps", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn store_failure_is_500() {
        let (status, body) = send(&failing_app(), Method::GET, "/api/apps", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch application inventory" }));
    }
}

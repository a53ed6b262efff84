//! Gateway handlers

use axum::{extract::{rejection::JsonRejection, State}, Json};

use crate::error::StoreResultExt;
use crate::handlers::{body, SuccessResponse};
use crate::models::{Gateway, UpdateGatewayRequest};
use crate::{AppResult, AppState};

const FETCH_FAILED: &str = "Failed to fetch gateways";
const UPDATE_FAILED: &str = "Failed to update gateway";

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Gateway>>> {
    let gateways = state.store.get_gateways().await.or_fail(FETCH_FAILED)?;
    Ok(Json(gateways))
}

pub async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateGatewayRequest>, JsonRejection>,
) -> AppResult<Json<SuccessResponse>> {
    let UpdateGatewayRequest { id, fields } = body(payload, UPDATE_FAILED)?;

    state
        .store
        .update_gateway(&id, fields)
        .await
        .or_fail(UPDATE_FAILED)?;

    tracing::info!(gateway = %id, "Gateway updated");
    Ok(SuccessResponse::ok())
}

#[cfg(test)]
mod tests {
    use crate::store::Store;
    use crate::test_support::{failing_app, memory_app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn lists_gateways() {
        let (app, store) = memory_app();
        let expected = serde_json::to_value(store.get_gateways().await.unwrap()).unwrap();

        let (status, body) = send(&app, Method::GET, "/api/system/gateways", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let (app, store) = memory_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/system/gateways",
            Some(json!({ "id": "gw-eu-west", "enabled": false, "owner": "netops" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let gateways = store.get_gateways().await.unwrap();
        let gw = gateways.iter().find(|g| g.id == "gw-eu-west").unwrap();
        assert!(!gw.enabled);
        assert_eq!(gw.extra["owner"], "netops");
    }

    #[tokio::test]
    async fn unknown_gateway_is_404() {
        let (app, _store) = memory_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/system/gateways",
            Some(json!({ "id": "gw-nowhere", "enabled": false })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Failed to update gateway" }));
    }

    #[tokio::test]
    async fn store_failures_are_500() {
        let app = failing_app();

        let (status, body) = send(&app, Method::GET, "/api/system/gateways", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch gateways" }));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/system/gateways",
            Some(json!({ "id": "gw-us-east", "enabled": true })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to update gateway" }));
    }
}

//! Session handlers
//!
//! The dashboard session is a single cookie. There is no server-side session
//! store, so logout only has to clear the cookie.

use axum::{extract::{rejection::JsonRejection, State}, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;

use crate::config::SESSION_COOKIE;
use crate::handlers::SuccessResponse;
use crate::models::LogLevel;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub passkey: String,
}

/// Exchange the access passkey for a session cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<SuccessResponse>)> {
    // an unreadable body is treated as a wrong passkey
    let passkey = payload.map(|Json(req)| req.passkey).unwrap_or_default();

    if passkey != state.config.access_passkey {
        tracing::warn!("Rejected login attempt");
        return Err(AppError::Unauthorized("Invalid Access Code"));
    }

    state
        .record(
            LogLevel::Info,
            "AUTH",
            &format!("Session authenticated for user: {}", state.actor.name),
        )
        .await;

    let cookie = Cookie::build((SESSION_COOKIE, "active"))
        .http_only(true)
        .secure(state.config.is_production())
        .max_age(time::Duration::weeks(1))
        .path("/");

    Ok((jar.add(cookie), SuccessResponse::ok()))
}

/// Clear the session cookie. Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    state
        .record(
            LogLevel::Info,
            "AUTH",
            &format!("Session terminated by user: {}", state.actor.name),
        )
        .await;

    // Sent even when the request carried no cookie
    let mut removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    removal.make_removal();

    (jar.add(removal), SuccessResponse::ok())
}

#[cfg(test)]
mod tests {
    use crate::store::Store;
    use crate::test_support::{failing_app, memory_app, request};
    use axum::http::{header, Method, StatusCode};
    use serde_json::json;

    fn set_cookie(headers: &axum::http::HeaderMap) -> String {
        headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_logs() {
        let (app, store) = memory_app();

        let (status, headers, body) = request(
            &app,
            Method::POST,
            "/api/auth/logout",
            None,
            Some("sentinel_session=active"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
        let cookie = set_cookie(&headers);
        assert!(cookie.starts_with("sentinel_session="));
        assert!(cookie.contains("Max-Age=0"));

        let logs = store.get_system_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].log_type, "INFO");
        assert_eq!(logs[0].component, "AUTH");
        assert_eq!(logs[0].message, "Session terminated by user: ANALYST_01");
    }

    #[tokio::test]
    async fn logout_without_cookie_still_succeeds() {
        let (status, headers, body) =
            request(&failing_app(), Method::POST, "/api/auth/logout", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
        assert!(set_cookie(&headers).starts_with("sentinel_session="));
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let (app, _store) = memory_app();
        let (status, headers, body) = request(
            &app,
            Method::POST,
            "/api/auth",
            Some(json!({ "passkey": "SENTINEL-ACCESS" })),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
        let cookie = set_cookie(&headers);
        assert!(cookie.starts_with("sentinel_session=active"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn login_rejects_wrong_passkey() {
        let (app, _store) = memory_app();
        let (status, headers, body) = request(
            &app,
            Method::POST,
            "/api/auth",
            Some(json!({ "passkey": "guess" })),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Invalid Access Code" }));
        assert!(headers.get(header::SET_COOKIE).is_none());
    }
}

//! Router test helpers

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::audit::NewAuditEntry;
use crate::config::Config;
use crate::models::{
    Application, AuditLogEntry, ChartPoint, Command, Gateway, LogLevel, PolicyRule, SensorStatus,
    Stats, SystemConfig, SystemLogEntry, TelemetryEvent,
};
use crate::store::{MemoryStore, Store, StoreError, StoreResult};
use crate::{create_router, AppState};

pub fn memory_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (AppState::new(store.clone(), Config::default()), store)
}

pub fn memory_app() -> (Router, Arc<MemoryStore>) {
    let (state, store) = memory_state();
    (create_router(state), store)
}

/// Router over a store whose every call fails as a lost connection
pub fn failing_app() -> Router {
    create_router(AppState::new(Arc::new(FailingStore), Config::default()))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, body) = request(app, method, uri, body, None).await;
    (status, body)
}

pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, headers, body)
}

struct FailingStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Connection("connection refused".to_string()))
}

#[async_trait]
impl Store for FailingStore {
    async fn get_applications(&self) -> StoreResult<Vec<Application>> { down() }
    async fn seed_initial_apps(&self) -> StoreResult<()> { down() }
    async fn get_audit_logs(&self) -> StoreResult<Vec<AuditLogEntry>> { down() }
    async fn append_audit(&self, _: NewAuditEntry) -> StoreResult<AuditLogEntry> { down() }
    async fn queue_command(&self, _: &str, _: &str, _: Value) -> StoreResult<()> { down() }
    async fn pop_commands(&self, _: &str) -> StoreResult<Vec<Command>> { down() }
    async fn get_policies(&self) -> StoreResult<Vec<PolicyRule>> { down() }
    async fn update_policies(&self, _: Vec<PolicyRule>) -> StoreResult<()> { down() }
    async fn get_policy_version(&self) -> StoreResult<String> { down() }
    async fn get_stats(&self) -> StoreResult<Stats> { down() }
    async fn get_chart_data(&self) -> StoreResult<Vec<ChartPoint>> { down() }
    async fn get_gateways(&self) -> StoreResult<Vec<Gateway>> { down() }
    async fn update_gateway(&self, _: &str, _: Map<String, Value>) -> StoreResult<()> { down() }
    async fn get_sensors(&self) -> StoreResult<Vec<SensorStatus>> { down() }
    async fn update_sensor(&self, _: SensorStatus) -> StoreResult<()> { down() }
    async fn get_alerts(&self) -> StoreResult<Vec<TelemetryEvent>> { down() }
    async fn add_alert(&self, _: TelemetryEvent) -> StoreResult<()> { down() }
    async fn check_connection(&self) -> bool { false }
    async fn get_system_logs(&self) -> StoreResult<Vec<SystemLogEntry>> { down() }
    async fn add_system_log(&self, _: LogLevel, _: &str, _: &str) -> StoreResult<()> { down() }
    async fn get_system_config(&self) -> StoreResult<SystemConfig> { down() }
    async fn update_system_config(&self, _: &str, _: &str) -> StoreResult<()> { down() }
}

//! Store capability
//!
//! Every route talks to persistence through [`Store`]. The router receives a
//! [`SharedStore`] in its state, so handlers never reach for a global.
//!
//! - `postgres`: production backend on `sqlx`
//! - `memory`: in-process backend for local runs and tests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::audit::NewAuditEntry;
use crate::models::{
    Application, AuditLogEntry, ChartPoint, Command, Gateway, LogLevel, PolicyRule,
    SensorStatus, Stats, SystemConfig, SystemLogEntry, TelemetryEvent,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

pub type SharedStore = Arc<dyn Store>;

/// Failure kinds a store reports. Handlers map each kind to one status code.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("invalid data: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::Encode(_)
            | sqlx::Error::TypeNotFound { .. } => StoreError::Validation(err.to_string()),
            other => StoreError::Connection(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Validation(err.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // Inventory
    async fn get_applications(&self) -> StoreResult<Vec<Application>>;
    async fn seed_initial_apps(&self) -> StoreResult<()>;

    // Audit ledger
    async fn get_audit_logs(&self) -> StoreResult<Vec<AuditLogEntry>>;
    /// Chain `entry` onto the current tail and store it as one atomic write
    async fn append_audit(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry>;

    // Commands
    async fn queue_command(&self, sensor_id: &str, command_type: &str, payload: Value) -> StoreResult<()>;
    async fn pop_commands(&self, sensor_id: &str) -> StoreResult<Vec<Command>>;

    // Policies
    async fn get_policies(&self) -> StoreResult<Vec<PolicyRule>>;
    async fn update_policies(&self, policies: Vec<PolicyRule>) -> StoreResult<()>;
    async fn get_policy_version(&self) -> StoreResult<String>;

    // Analytics
    async fn get_stats(&self) -> StoreResult<Stats>;
    async fn get_chart_data(&self) -> StoreResult<Vec<ChartPoint>>;

    // Gateways
    async fn get_gateways(&self) -> StoreResult<Vec<Gateway>>;
    async fn update_gateway(&self, id: &str, fields: Map<String, Value>) -> StoreResult<()>;

    // Sensors and telemetry
    async fn get_sensors(&self) -> StoreResult<Vec<SensorStatus>>;
    async fn update_sensor(&self, status: SensorStatus) -> StoreResult<()>;
    async fn get_alerts(&self) -> StoreResult<Vec<TelemetryEvent>>;
    async fn add_alert(&self, event: TelemetryEvent) -> StoreResult<()>;

    // System
    async fn check_connection(&self) -> bool;
    async fn get_system_logs(&self) -> StoreResult<Vec<SystemLogEntry>>;
    async fn add_system_log(&self, level: LogLevel, component: &str, message: &str) -> StoreResult<()>;
    async fn get_system_config(&self) -> StoreResult<SystemConfig>;
    async fn update_system_config(&self, key: &str, value: &str) -> StoreResult<()>;
}

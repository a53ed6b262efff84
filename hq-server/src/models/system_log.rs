//! System log model (operational log buffer shown on the dashboard)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Number of entries returned by a listing
pub const SYSTEM_LOG_LIMIT: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// `log_type` stays a string: diagnostics write levels outside [`LogLevel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SystemLogEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub log_type: String,
    pub component: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl SystemLogEntry {
    pub async fn insert(
        pool: &PgPool,
        level: LogLevel,
        component: &str,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO system_logs (log_type, component, message) VALUES ($1, $2, $3)")
            .bind(level.as_str())
            .bind(component)
            .bind(message)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn list_recent(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SystemLogEntry>(
            r#"
            SELECT id, log_type, component, message, timestamp
            FROM system_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT $1
            "#
        )
        .bind(SYSTEM_LOG_LIMIT)
        .fetch_all(pool)
        .await
    }
}

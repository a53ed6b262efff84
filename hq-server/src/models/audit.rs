//! Audit ledger model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::audit::NewAuditEntry;

/// Number of entries returned by a listing
pub const AUDIT_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Severity::Info),
            "WARN" => Ok(Severity::Warn),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub target_resource: String,
    pub details: serde_json::Value,
    pub severity: Severity,
    /// SHA-256 over this entry chained to the previous entry's hash
    pub hash: String,
    pub timestamp: DateTime<Utc>,
}

/// Advisory lock key serializing ledger appends
const AUDIT_CHAIN_LOCK: i64 = 0x5e47_a0d1;

impl AuditLogEntry {
    /// Seal `entry` onto the newest row and insert it in one transaction.
    /// The advisory lock makes concurrent appends take turns on the tail.
    pub async fn append_chained(pool: &PgPool, entry: NewAuditEntry) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(AUDIT_CHAIN_LOCK)
            .execute(&mut *tx)
            .await?;

        let prev_hash: Option<String> =
            sqlx::query_scalar("SELECT hash FROM audit_log ORDER BY timestamp DESC LIMIT 1")
                .fetch_optional(&mut *tx)
                .await?;

        let sealed = entry.seal(prev_hash.as_deref());
        Self::insert(&mut *tx, &sealed).await?;

        tx.commit().await?;
        Ok(sealed)
    }

    async fn insert(conn: &mut PgConnection, entry: &AuditLogEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, actor_id, actor_name, action, target_resource, details, severity, hash, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#
        )
        .bind(entry.id)
        .bind(&entry.actor_id)
        .bind(&entry.actor_name)
        .bind(&entry.action)
        .bind(&entry.target_resource)
        .bind(&entry.details)
        .bind(entry.severity.as_str())
        .bind(&entry.hash)
        .bind(entry.timestamp)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn list_recent(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, actor_id, actor_name, action, target_resource, details, severity, hash, timestamp
            FROM audit_log
            ORDER BY timestamp DESC
            LIMIT $1
            "#
        )
        .bind(AUDIT_LIMIT)
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let severity: String = r.try_get("severity")?;
                Ok(AuditLogEntry {
                    id: r.try_get("id")?,
                    actor_id: r.try_get("actor_id")?,
                    actor_name: r.try_get("actor_name")?,
                    action: r.try_get("action")?,
                    target_resource: r.try_get("target_resource")?,
                    details: r.try_get("details")?,
                    severity: severity.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
                    hash: r.try_get("hash")?,
                    timestamp: r.try_get("timestamp")?,
                })
            })
            .collect()
    }
}

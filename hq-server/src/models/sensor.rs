//! Sensor model (endpoints reporting to HQ)

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use validator::Validate;

use super::{Command, PolicyRule};

/// A sensor counts as online when seen within this window
pub const ONLINE_WINDOW_MS: i64 = 60_000;

pub const DEFAULT_SENSOR_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorState {
    Online,
    Offline,
    Warning,
}

impl SensorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorState::Online => "ONLINE",
            SensorState::Offline => "OFFLINE",
            SensorState::Warning => "WARNING",
        }
    }
}

impl FromStr for SensorState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONLINE" => Ok(SensorState::Online),
            "OFFLINE" => Ok(SensorState::Offline),
            "WARNING" => Ok(SensorState::Warning),
            other => Err(format!("unknown sensor status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStatus {
    pub id: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Milliseconds since the Unix epoch
    pub last_seen: i64,
    pub status: SensorState,
    pub version: String,
}

impl SensorStatus {
    pub fn is_online(&self, now_ms: i64) -> bool {
        now_ms - self.last_seen < ONLINE_WINDOW_MS
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub hostname: String,
    pub version: Option<String>,
    pub policy_version: Option<String>,
}

impl HeartbeatRequest {
    pub fn to_status(&self, now_ms: i64, ip_address: Option<String>) -> SensorStatus {
        SensorStatus {
            id: self.id.clone(),
            hostname: self.hostname.clone(),
            ip_address,
            last_seen: now_ms,
            status: SensorState::Online,
            version: self.version.clone()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SENSOR_VERSION.to_string()),
        }
    }
}

/// Reply to a sensor heartbeat. `policies` is null when the sensor is current.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub policies: Option<Vec<PolicyRule>>,
    pub policy_version: String,
    pub commands: Vec<Command>,
}

impl SensorStatus {
    /// Upsert by id. Hostnames are unique, so another sensor holding this
    /// hostname is replaced and its address carried over when none is given.
    pub async fn upsert(pool: &PgPool, status: &SensorStatus) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let taken_over: Option<Option<String>> = sqlx::query_scalar(
            "DELETE FROM sensors WHERE hostname = $1 AND id <> $2 RETURNING ip_address"
        )
        .bind(&status.hostname)
        .bind(&status.id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO sensors (id, hostname, ip_address, last_seen, status, version)
            VALUES ($1, $2, COALESCE($3, $7), $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                hostname = EXCLUDED.hostname,
                ip_address = COALESCE($3, sensors.ip_address, $7),
                last_seen = EXCLUDED.last_seen,
                status = EXCLUDED.status,
                version = EXCLUDED.version
            "#
        )
        .bind(&status.id)
        .bind(&status.hostname)
        .bind(&status.ip_address)
        .bind(status.last_seen)
        .bind(status.status.as_str())
        .bind(&status.version)
        .bind(taken_over.flatten())
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, hostname, ip_address, last_seen, status, version FROM sensors ORDER BY hostname"
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let status: String = r.try_get("status")?;
                Ok(SensorStatus {
                    id: r.try_get("id")?,
                    hostname: r.try_get("hostname")?,
                    ip_address: r.try_get("ip_address")?,
                    last_seen: r.try_get("last_seen")?,
                    status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
                    version: r.try_get("version")?,
                })
            })
            .collect()
    }

    pub async fn count(pool: &PgPool, seen_after_ms: Option<i64>) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM sensors WHERE last_seen > COALESCE($1, -1)"
        )
        .bind(seen_after_ms)
        .fetch_one(pool)
        .await?;
        row.try_get("count")
    }
}

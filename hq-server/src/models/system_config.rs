//! Runtime engine settings editable from the dashboard

use serde::Deserialize;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

pub type SystemConfig = BTreeMap<String, String>;

/// Values reported for keys that were never written
pub fn default_system_config() -> SystemConfig {
    [
        ("risk_sensitivity", "75"),
        ("engine_enabled", "true"),
        ("anomaly_threshold", "0.85"),
        ("model_version", "3.14.0-sentinel"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub key: String,
    pub value: String,
}

pub async fn load(pool: &PgPool) -> Result<SystemConfig, sqlx::Error> {
    let rows = sqlx::query("SELECT key, value FROM system_config")
        .fetch_all(pool)
        .await?;

    let mut config = default_system_config();
    for r in rows {
        config.insert(r.try_get("key")?, r.try_get("value")?);
    }
    Ok(config)
}

pub async fn upsert(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO system_config (key, value, updated_at) VALUES ($1, $2, NOW())
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        "#
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Cheap round trip used by the health endpoint
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT key FROM system_config LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(())
}

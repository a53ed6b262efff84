//! Command model (queued actions delivered to sensors on heartbeat)

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Command type whose audit entry is recorded as critical
pub const ISOLATE: &str = "ISOLATE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: Uuid,
    pub sensor_id: String,
    #[serde(rename = "type")]
    pub command_type: String,
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch
    pub queued_at: i64,
}

impl Command {
    pub fn new(sensor_id: &str, command_type: &str, payload: serde_json::Value, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sensor_id: sensor_id.to_string(),
            command_type: command_type.to_string(),
            payload,
            queued_at: now_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCommandRequest {
    pub sensor_id: String,
    #[serde(rename = "type")]
    pub command_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Command {
    pub async fn insert(pool: &PgPool, command: &Command) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO commands (id, sensor_id, command_type, payload, queued_at)
            VALUES ($1, $2, $3, $4, $5)
            "#
        )
        .bind(command.id)
        .bind(&command.sensor_id)
        .bind(&command.command_type)
        .bind(&command.payload)
        .bind(command.queued_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove and return every pending command for a sensor, oldest first
    pub async fn pop_for_sensor(pool: &PgPool, sensor_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            DELETE FROM commands
            WHERE sensor_id = $1
            RETURNING id, sensor_id, command_type, payload, queued_at
            "#
        )
        .bind(sensor_id)
        .fetch_all(pool)
        .await?;

        let mut commands = rows.into_iter()
            .map(|r| {
                Ok(Command {
                    id: r.try_get("id")?,
                    sensor_id: r.try_get("sensor_id")?,
                    command_type: r.try_get("command_type")?,
                    payload: r.try_get("payload")?,
                    queued_at: r.try_get("queued_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        commands.sort_by_key(|c| c.queued_at);
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_payload_is_optional() {
        let req: QueueCommandRequest = serde_json::from_value(json!({
            "sensorId": "S1",
            "type": "BLOCK_CLIPBOARD",
        }))
        .unwrap();
        assert_eq!(req.payload, serde_json::Value::Null);
    }

    #[test]
    fn command_wire_format() {
        let cmd = Command::new("S1", ISOLATE, json!("enable"), 42);
        let v = serde_json::to_value(&cmd).unwrap();
        assert_eq!(v["sensorId"], "S1");
        assert_eq!(v["type"], "ISOLATE");
        assert_eq!(v["queuedAt"], 42);
    }
}

//! Telemetry event model (alerts reported by sensors)

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use validator::Validate;

/// Maximum number of alerts returned by a listing
pub const ALERT_LIMIT: i64 = 1000;

/// Known event types. Sensors may report others; those round-trip as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ClipboardBlock,
    ClipboardLog,
    WindowRisk,
    BrowserUsage,
    Heartbeat,
    SystemAlert,
    SystemStartup,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::ClipboardBlock => "CLIPBOARD_BLOCK",
            EventType::ClipboardLog => "CLIPBOARD_LOG",
            EventType::WindowRisk => "WINDOW_RISK",
            EventType::BrowserUsage => "BROWSER_USAGE",
            EventType::Heartbeat => "HEARTBEAT",
            EventType::SystemAlert => "SYSTEM_ALERT",
            EventType::SystemStartup => "SYSTEM_STARTUP",
            EventType::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "CLIPBOARD_BLOCK" => EventType::ClipboardBlock,
            "CLIPBOARD_LOG" => EventType::ClipboardLog,
            "WINDOW_RISK" => EventType::WindowRisk,
            "BROWSER_USAGE" => EventType::BrowserUsage,
            "HEARTBEAT" => EventType::Heartbeat,
            "SYSTEM_ALERT" => EventType::SystemAlert,
            "SYSTEM_STARTUP" => EventType::SystemStartup,
            _ => EventType::Other(s),
        }
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        t.as_str().to_string()
    }
}

/// Free-form context attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub id: String,
    pub sensor_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

/// Alert as posted by a sensor; id and timestamp are assigned when missing
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportAlertRequest {
    pub id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub sensor_id: String,
    #[serde(default, rename = "type")]
    #[validate(length(min = 1))]
    pub event_type: String,
    pub timestamp: Option<i64>,
    pub hostname: Option<String>,
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl ReportAlertRequest {
    pub fn into_event(self, now_ms: i64) -> TelemetryEvent {
        TelemetryEvent {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            sensor_id: self.sensor_id,
            event_type: EventType::from(self.event_type),
            timestamp: self.timestamp.unwrap_or(now_ms),
            hostname: self.hostname,
            payload: self.payload,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportAlertResponse {
    pub success: bool,
    pub id: String,
}

impl TelemetryEvent {
    pub async fn insert(pool: &PgPool, event: &TelemetryEvent) -> Result<(), sqlx::Error> {
        let metadata = serde_json::to_value(&event.metadata)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            r#"
            INSERT INTO alerts (id, sensor_id, event_type, timestamp, hostname, payload, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#
        )
        .bind(&event.id)
        .bind(&event.sensor_id)
        .bind(event.event_type.as_str())
        .bind(event.timestamp)
        .bind(event.hostname.as_deref().unwrap_or("unknown"))
        .bind(&event.payload)
        .bind(&metadata)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_recent(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, sensor_id, event_type, timestamp, hostname, payload, metadata
            FROM alerts
            ORDER BY timestamp DESC
            LIMIT $1
            "#
        )
        .bind(ALERT_LIMIT)
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let metadata: Option<serde_json::Value> = r.try_get("metadata")?;
                let metadata = metadata
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
                    .unwrap_or_default();

                Ok(TelemetryEvent {
                    id: r.try_get("id")?,
                    sensor_id: r.try_get("sensor_id")?,
                    event_type: EventType::from(r.try_get::<String, _>("event_type")?),
                    timestamp: r.try_get("timestamp")?,
                    hostname: r.try_get("hostname")?,
                    payload: r.try_get("payload")?,
                    metadata,
                })
            })
            .collect()
    }

    /// Timestamps of alerts newer than `since_ms`
    pub async fn timestamps_since(pool: &PgPool, since_ms: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows = sqlx::query("SELECT timestamp FROM alerts WHERE timestamp > $1")
            .bind(since_ms)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(|r| r.try_get("timestamp")).collect()
    }

    pub async fn count(pool: &PgPool, event_type: Option<&EventType>) -> Result<i64, sqlx::Error> {
        let row = match event_type {
            Some(t) => {
                sqlx::query("SELECT COUNT(*) AS count FROM alerts WHERE event_type = $1")
                    .bind(t.as_str())
                    .fetch_one(pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS count FROM alerts")
                    .fetch_one(pool)
                    .await?
            }
        };
        row.try_get("count")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_event_types_round_trip() {
        let event: TelemetryEvent = serde_json::from_value(json!({
            "id": "a1",
            "sensorId": "S1",
            "type": "USB_INSERT",
            "timestamp": 10,
        }))
        .unwrap();

        assert_eq!(event.event_type, EventType::Other("USB_INSERT".into()));
        assert_eq!(serde_json::to_value(&event).unwrap()["type"], "USB_INSERT");
    }

    #[test]
    fn alert_request_fills_id_and_timestamp() {
        let req: ReportAlertRequest = serde_json::from_value(json!({
            "sensorId": "S1",
            "type": "CLIPBOARD_BLOCK",
            "metadata": { "policyName": "AWS_ACCESS_KEY" }
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let event = req.into_event(1_700_000_000_000);
        assert_eq!(event.event_type, EventType::ClipboardBlock);
        assert_eq!(event.timestamp, 1_700_000_000_000);
        assert!(uuid::Uuid::parse_str(&event.id).is_ok());
        assert_eq!(event.metadata.policy_name.as_deref(), Some("AWS_ACCESS_KEY"));
    }

    #[test]
    fn alert_request_requires_sensor_and_type() {
        let req: ReportAlertRequest = serde_json::from_value(json!({ "type": "HEARTBEAT" })).unwrap();
        assert!(req.validate().is_err());
    }
}

//! HQ API Client
//!
//! HTTP client for communicating with the Sentinel HQ server.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

/// HQ API client bound to one server URL
#[derive(Clone)]
pub struct HqClient {
    base_url: String,
    http_client: reqwest::Client,
}

// Request/Response types

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub id: String,
    pub hostname: String,
    pub version: String,
    pub policy_version: Option<String>,
}

/// `policies` is absent when the sensor already holds `policy_version`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub policies: Option<Vec<PolicyRule>>,
    pub policy_version: String,
    #[serde(default)]
    pub commands: Vec<SensorCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub pattern: String,
    /// `BLOCK` or `LOG_ONLY`
    pub action: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorCommand {
    pub id: String,
    #[serde(rename = "type")]
    pub command_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub queued_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: String,
    pub sensor_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: i64,
    pub hostname: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct AlertAck {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub db: String,
}

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    stats: serde_json::Value,
}

impl HqClient {
    pub fn new(base_url: &str) -> Result<Self, HqError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| HqError::NetworkError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Same connection pool, different server
    pub fn at(&self, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: self.http_client.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check server health
    pub async fn health_check(&self, timeout: Duration) -> Result<HealthResponse, HqError> {
        let url = format!("{}/api/system/health", self.base_url);

        let response = self.http_client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| HqError::NetworkError(e.to_string()))?;

        Self::parse(response).await
    }

    /// Send heartbeat; the reply carries policy updates and queued commands
    pub async fn heartbeat(&self, request: &HeartbeatRequest) -> Result<HeartbeatResponse, HqError> {
        let url = format!("{}/api/telemetry/heartbeat", self.base_url);

        let response = self.http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| HqError::NetworkError(e.to_string()))?;

        Self::parse(response).await
    }

    pub async fn report_alert(&self, event: &AlertEvent) -> Result<AlertAck, HqError> {
        let url = format!("{}/api/telemetry/alert", self.base_url);

        let response = self.http_client
            .post(&url)
            .json(event)
            .send()
            .await
            .map_err(|e| HqError::NetworkError(e.to_string()))?;

        Self::parse(response).await
    }

    /// Fleet-wide counters from the dashboard analytics route
    pub async fn global_stats(&self) -> Result<serde_json::Value, HqError> {
        let url = format!("{}/api/stats", self.base_url);

        let response = self.http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| HqError::NetworkError(e.to_string()))?;

        let dashboard: DashboardResponse = Self::parse(response).await?;
        Ok(dashboard.stats)
    }

    /// Newest alerts first, at most `limit`
    pub async fn recent_alerts(&self, limit: usize) -> Result<Vec<serde_json::Value>, HqError> {
        let url = format!("{}/api/telemetry/alert", self.base_url);

        let response = self.http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| HqError::NetworkError(e.to_string()))?;

        let mut alerts: Vec<serde_json::Value> = Self::parse(response).await?;
        alerts.truncate(limit);
        Ok(alerts)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, HqError> {
        if response.status().is_success() {
            response.json().await
                .map_err(|e| HqError::ParseError(e.to_string()))
        } else {
            Err(HqError::ServerError(response.status().as_u16()))
        }
    }
}

/// HQ client errors
#[derive(Debug, Clone)]
pub enum HqError {
    NetworkError(String),
    ServerError(u16),
    ParseError(String),
}

impl std::fmt::Display for HqError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError(e) => write!(f, "Network error: {}", e),
            Self::ServerError(code) => write!(f, "Server error: {}", code),
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for HqError {}

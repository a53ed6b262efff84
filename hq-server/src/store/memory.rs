//! In-memory store for local development and tests

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::audit::NewAuditEntry;
use crate::models::{
    self, policy_version, Application, AuditLogEntry, ChartPoint, Command, EventType, Gateway,
    LogLevel, PolicyRule, SensorStatus, Stats, SystemConfig, SystemLogEntry, TelemetryEvent,
    ALERT_LIMIT, AUDIT_LIMIT, SYSTEM_LOG_LIMIT,
};

pub struct MemoryStore {
    applications: RwLock<Vec<Application>>,
    audit: RwLock<Vec<AuditLogEntry>>,
    commands: RwLock<Vec<Command>>,
    policies: RwLock<Vec<PolicyRule>>,
    gateways: RwLock<Vec<Gateway>>,
    sensors: RwLock<Vec<SensorStatus>>,
    /// Newest first
    alerts: RwLock<Vec<TelemetryEvent>>,
    /// Oldest first, capped at the listing size
    system_logs: RwLock<Vec<SystemLogEntry>>,
    config: RwLock<SystemConfig>,
    next_log_id: AtomicI64,
    connected: AtomicBool,
    fail_audit: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            applications: RwLock::new(Vec::new()),
            audit: RwLock::new(Vec::new()),
            commands: RwLock::new(Vec::new()),
            policies: RwLock::new(Vec::new()),
            gateways: RwLock::new(models::default_gateways()),
            sensors: RwLock::new(Vec::new()),
            alerts: RwLock::new(Vec::new()),
            system_logs: RwLock::new(Vec::new()),
            config: RwLock::new(SystemConfig::new()),
            next_log_id: AtomicI64::new(1),
            connected: AtomicBool::new(true),
            fail_audit: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Make every ledger write fail while the rest of the store keeps working
    #[cfg(test)]
    pub fn fail_audit_writes(&self) {
        self.fail_audit.store(true, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub async fn held_system_logs(&self) -> usize {
        self.system_logs.read().await.len()
    }

    #[cfg(test)]
    pub async fn pending_commands(&self) -> Vec<Command> {
        self.commands.read().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_applications(&self) -> StoreResult<Vec<Application>> {
        Ok(self.applications.read().await.clone())
    }

    async fn seed_initial_apps(&self) -> StoreResult<()> {
        let mut apps = self.applications.write().await;
        if apps.is_empty() {
            *apps = models::initial_apps();
        }
        Ok(())
    }

    async fn get_audit_logs(&self) -> StoreResult<Vec<AuditLogEntry>> {
        let audit = self.audit.read().await;
        Ok(audit.iter().rev().take(AUDIT_LIMIT as usize).cloned().collect())
    }

    async fn append_audit(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry> {
        if self.fail_audit.load(Ordering::Relaxed) {
            return Err(StoreError::Connection("audit ledger unavailable".to_string()));
        }

        let mut audit = self.audit.write().await;
        let sealed = entry.seal(audit.last().map(|e| e.hash.as_str()));
        audit.push(sealed.clone());
        Ok(sealed)
    }

    async fn queue_command(&self, sensor_id: &str, command_type: &str, payload: Value) -> StoreResult<()> {
        let command = Command::new(sensor_id, command_type, payload, Utc::now().timestamp_millis());
        self.commands.write().await.push(command);
        Ok(())
    }

    async fn pop_commands(&self, sensor_id: &str) -> StoreResult<Vec<Command>> {
        let mut commands = self.commands.write().await;
        let (popped, remaining): (Vec<_>, Vec<_>) = commands
            .drain(..)
            .partition(|c| c.sensor_id == sensor_id);
        *commands = remaining;
        Ok(popped)
    }

    async fn get_policies(&self) -> StoreResult<Vec<PolicyRule>> {
        let mut policies = self.policies.write().await;
        if policies.is_empty() {
            *policies = models::default_policies();
        }
        Ok(policies.clone())
    }

    async fn update_policies(&self, policies: Vec<PolicyRule>) -> StoreResult<()> {
        *self.policies.write().await = policies;
        Ok(())
    }

    async fn get_policy_version(&self) -> StoreResult<String> {
        Ok(policy_version(&self.policies.read().await))
    }

    async fn get_stats(&self) -> StoreResult<Stats> {
        let now_ms = Utc::now().timestamp_millis();
        let sensors = self.sensors.read().await;
        let alerts = self.alerts.read().await;

        Ok(Stats {
            total_agents: sensors.len() as i64,
            online_agents: sensors.iter().filter(|s| s.is_online(now_ms)).count() as i64,
            threats_blocked: alerts
                .iter()
                .filter(|a| a.event_type == EventType::ClipboardBlock)
                .count() as i64,
            total_events: alerts.len() as i64,
            active_policies: self.policies.read().await.len() as i64,
        })
    }

    async fn get_chart_data(&self) -> StoreResult<Vec<ChartPoint>> {
        let timestamps: Vec<i64> = self.alerts.read().await.iter().map(|a| a.timestamp).collect();
        Ok(models::hourly_chart(&timestamps, Utc::now()))
    }

    async fn get_gateways(&self) -> StoreResult<Vec<Gateway>> {
        Ok(self.gateways.read().await.clone())
    }

    async fn update_gateway(&self, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let mut gateways = self.gateways.write().await;
        let gateway = gateways
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("gateway {}", id)))?;

        *gateway = gateway.merged(&fields)?;
        Ok(())
    }

    async fn get_sensors(&self) -> StoreResult<Vec<SensorStatus>> {
        Ok(self.sensors.read().await.clone())
    }

    async fn update_sensor(&self, status: SensorStatus) -> StoreResult<()> {
        let mut sensors = self.sensors.write().await;

        let by_id = sensors.iter().position(|s| s.id == status.id);
        let by_hostname = sensors
            .iter()
            .position(|s| s.hostname == status.hostname && s.id != status.id);

        let ip_address = status
            .ip_address
            .clone()
            .or_else(|| by_id.and_then(|i| sensors[i].ip_address.clone()))
            .or_else(|| by_hostname.and_then(|i| sensors[i].ip_address.clone()));
        let status = SensorStatus { ip_address, ..status };

        match (by_id, by_hostname) {
            (Some(i), Some(taken)) => {
                sensors[i] = status;
                sensors.remove(taken);
            }
            (Some(i), None) | (None, Some(i)) => sensors[i] = status,
            (None, None) => sensors.push(status),
        }
        Ok(())
    }

    async fn get_alerts(&self) -> StoreResult<Vec<TelemetryEvent>> {
        Ok(self.alerts.read().await.clone())
    }

    async fn add_alert(&self, event: TelemetryEvent) -> StoreResult<()> {
        let mut alerts = self.alerts.write().await;
        alerts.insert(0, event);
        alerts.truncate(ALERT_LIMIT as usize);
        Ok(())
    }

    async fn check_connection(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn get_system_logs(&self) -> StoreResult<Vec<SystemLogEntry>> {
        let logs = self.system_logs.read().await;
        Ok(logs.iter().rev().take(SYSTEM_LOG_LIMIT as usize).cloned().collect())
    }

    async fn add_system_log(&self, level: LogLevel, component: &str, message: &str) -> StoreResult<()> {
        let entry = SystemLogEntry {
            id: self.next_log_id.fetch_add(1, Ordering::Relaxed),
            log_type: level.as_str().to_string(),
            component: component.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        };
        let mut logs = self.system_logs.write().await;
        logs.push(entry);
        let excess = logs.len().saturating_sub(SYSTEM_LOG_LIMIT as usize);
        logs.drain(..excess);
        Ok(())
    }

    async fn get_system_config(&self) -> StoreResult<SystemConfig> {
        let mut config = models::default_system_config();
        config.extend(self.config.read().await.clone());
        Ok(config)
    }

    async fn update_system_config(&self, key: &str, value: &str) -> StoreResult<()> {
        self.config.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorState;
    use serde_json::json;

    fn sensor(id: &str, hostname: &str) -> SensorStatus {
        SensorStatus {
            id: id.to_string(),
            hostname: hostname.to_string(),
            ip_address: None,
            last_seen: Utc::now().timestamp_millis(),
            status: SensorState::Online,
            version: "1.0.0".to_string(),
        }
    }

    #[tokio::test]
    async fn sensors_upsert_by_id_then_hostname() {
        let store = MemoryStore::new();
        store.update_sensor(sensor("S1", "ws-01")).await.unwrap();
        store.update_sensor(sensor("S1", "ws-01-renamed")).await.unwrap();
        store.update_sensor(sensor("S2", "ws-01-renamed")).await.unwrap();
        store.update_sensor(sensor("S3", "ws-03")).await.unwrap();

        let sensors = store.get_sensors().await.unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].id, "S2");
        assert_eq!(sensors[1].id, "S3");
    }

    #[tokio::test]
    async fn known_id_takes_hostname_from_another_sensor() {
        let store = MemoryStore::new();
        let mut first = sensor("S1", "ws-01");
        first.ip_address = Some("10.0.0.1".to_string());
        store.update_sensor(first).await.unwrap();
        store.update_sensor(sensor("S2", "ws-02")).await.unwrap();

        store.update_sensor(sensor("S2", "ws-01")).await.unwrap();

        let sensors = store.get_sensors().await.unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].id, "S2");
        assert_eq!(sensors[0].hostname, "ws-01");
        assert_eq!(sensors[0].ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn commands_are_delivered_once() {
        let store = MemoryStore::new();
        store.queue_command("S1", "ISOLATE", json!("enable")).await.unwrap();
        store.queue_command("S2", "BLOCK_CLIPBOARD", json!({})).await.unwrap();

        let first = store.pop_commands("S1").await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].command_type, "ISOLATE");
        assert!(store.pop_commands("S1").await.unwrap().is_empty());
        assert_eq!(store.pending_commands().await.len(), 1);
    }

    #[tokio::test]
    async fn policies_seed_when_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get_policy_version().await.unwrap(), models::EMPTY_POLICY_VERSION);

        let policies = store.get_policies().await.unwrap();
        assert_eq!(policies, models::default_policies());
        assert_ne!(store.get_policy_version().await.unwrap(), models::EMPTY_POLICY_VERSION);
    }

    #[tokio::test]
    async fn system_logs_newest_first() {
        let store = MemoryStore::new();
        store.add_system_log(LogLevel::Info, "AUTH", "first").await.unwrap();
        store.add_system_log(LogLevel::Debug, "API", "second").await.unwrap();

        let logs = store.get_system_logs().await.unwrap();
        assert_eq!(logs[0].message, "second");
        assert_eq!(logs[0].log_type, "DEBUG");
        assert_eq!(logs[1].component, "AUTH");
    }

    #[tokio::test]
    async fn system_log_buffer_is_bounded() {
        let store = MemoryStore::new();
        for i in 0..(SYSTEM_LOG_LIMIT + 250) {
            store
                .add_system_log(LogLevel::Debug, "API", &format!("poll {}", i))
                .await
                .unwrap();
        }

        assert_eq!(store.held_system_logs().await, SYSTEM_LOG_LIMIT as usize);
        let logs = store.get_system_logs().await.unwrap();
        assert_eq!(logs.len(), SYSTEM_LOG_LIMIT as usize);
        assert_eq!(logs[0].message, format!("poll {}", SYSTEM_LOG_LIMIT + 249));
    }

    #[tokio::test]
    async fn unknown_gateway_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_gateway("gw-missing", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn stats_count_blocks_and_policies() {
        let store = MemoryStore::new();
        store.update_sensor(sensor("S1", "ws-01")).await.unwrap();
        store.get_policies().await.unwrap();
        for (i, kind) in ["CLIPBOARD_BLOCK", "CLIPBOARD_LOG", "CLIPBOARD_BLOCK"].iter().enumerate() {
            store
                .add_alert(TelemetryEvent {
                    id: i.to_string(),
                    sensor_id: "S1".into(),
                    event_type: EventType::from(kind.to_string()),
                    timestamp: Utc::now().timestamp_millis(),
                    hostname: None,
                    payload: None,
                    metadata: Default::default(),
                })
                .await
                .unwrap();
        }

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_agents, 1);
        assert_eq!(stats.online_agents, 1);
        assert_eq!(stats.threats_blocked, 2);
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.active_policies, 4);
    }

    #[tokio::test]
    async fn config_overlays_defaults() {
        let store = MemoryStore::new();
        store.update_system_config("risk_sensitivity", "90").await.unwrap();
        let config = store.get_system_config().await.unwrap();
        assert_eq!(config["risk_sensitivity"], "90");
        assert_eq!(config["engine_enabled"], "true");
    }
}

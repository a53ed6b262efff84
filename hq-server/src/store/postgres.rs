//! PostgreSQL store

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;

use super::{Store, StoreError, StoreResult};
use crate::audit::NewAuditEntry;
use crate::models::{
    self, policy_version, system_config, Application, AuditLogEntry, ChartPoint, Command,
    EventType, Gateway, LogLevel, PolicyRule, SensorStatus, Stats, SystemConfig, SystemLogEntry,
    TelemetryEvent, ONLINE_WINDOW_MS,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seed rows a fresh database needs
    pub async fn seed(&self) -> StoreResult<()> {
        Gateway::seed_defaults(&self.pool).await?;
        Application::seed_if_empty(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_applications(&self) -> StoreResult<Vec<Application>> {
        Ok(Application::list(&self.pool).await?)
    }

    async fn seed_initial_apps(&self) -> StoreResult<()> {
        Ok(Application::seed_if_empty(&self.pool).await?)
    }

    async fn get_audit_logs(&self) -> StoreResult<Vec<AuditLogEntry>> {
        Ok(AuditLogEntry::list_recent(&self.pool).await?)
    }

    async fn append_audit(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry> {
        Ok(AuditLogEntry::append_chained(&self.pool, entry).await?)
    }

    async fn queue_command(&self, sensor_id: &str, command_type: &str, payload: Value) -> StoreResult<()> {
        let command = Command::new(sensor_id, command_type, payload, Utc::now().timestamp_millis());
        Command::insert(&self.pool, &command).await?;
        tracing::debug!("Queued {} for sensor {}", command_type, sensor_id);
        Ok(())
    }

    async fn pop_commands(&self, sensor_id: &str) -> StoreResult<Vec<Command>> {
        Ok(Command::pop_for_sensor(&self.pool, sensor_id).await?)
    }

    async fn get_policies(&self) -> StoreResult<Vec<PolicyRule>> {
        let policies = PolicyRule::list(&self.pool).await?;
        if !policies.is_empty() {
            return Ok(policies);
        }

        let defaults = models::default_policies();
        PolicyRule::replace_all(&self.pool, &defaults).await?;
        tracing::info!("Seeded {} default policies", defaults.len());
        Ok(defaults)
    }

    async fn update_policies(&self, policies: Vec<PolicyRule>) -> StoreResult<()> {
        Ok(PolicyRule::replace_all(&self.pool, &policies).await?)
    }

    async fn get_policy_version(&self) -> StoreResult<String> {
        let policies = PolicyRule::list(&self.pool).await?;
        Ok(policy_version(&policies))
    }

    async fn get_stats(&self) -> StoreResult<Stats> {
        let online_since = Utc::now().timestamp_millis() - ONLINE_WINDOW_MS;

        let (total_agents, online_agents, threats_blocked, total_events, active_policies) = tokio::try_join!(
            SensorStatus::count(&self.pool, None),
            SensorStatus::count(&self.pool, Some(online_since)),
            TelemetryEvent::count(&self.pool, Some(&EventType::ClipboardBlock)),
            TelemetryEvent::count(&self.pool, None),
            PolicyRule::count(&self.pool),
        )?;

        Ok(Stats {
            total_agents,
            online_agents,
            threats_blocked,
            total_events,
            active_policies,
        })
    }

    async fn get_chart_data(&self) -> StoreResult<Vec<ChartPoint>> {
        let now = Utc::now();
        let since = (now - Duration::hours(24)).timestamp_millis();
        let timestamps = TelemetryEvent::timestamps_since(&self.pool, since).await?;
        Ok(models::hourly_chart(&timestamps, now))
    }

    async fn get_gateways(&self) -> StoreResult<Vec<Gateway>> {
        Ok(Gateway::list(&self.pool).await?)
    }

    async fn update_gateway(&self, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let current = Gateway::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("gateway {}", id)))?;

        let updated = current.merged(&fields)?;
        Gateway::save(&self.pool, &updated).await?;
        Ok(())
    }

    async fn get_sensors(&self) -> StoreResult<Vec<SensorStatus>> {
        Ok(SensorStatus::list(&self.pool).await?)
    }

    async fn update_sensor(&self, status: SensorStatus) -> StoreResult<()> {
        Ok(SensorStatus::upsert(&self.pool, &status).await?)
    }

    async fn get_alerts(&self) -> StoreResult<Vec<TelemetryEvent>> {
        Ok(TelemetryEvent::list_recent(&self.pool).await?)
    }

    async fn add_alert(&self, event: TelemetryEvent) -> StoreResult<()> {
        Ok(TelemetryEvent::insert(&self.pool, &event).await?)
    }

    async fn check_connection(&self) -> bool {
        match system_config::ping(&self.pool).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Database ping failed: {}", e);
                false
            }
        }
    }

    async fn get_system_logs(&self) -> StoreResult<Vec<SystemLogEntry>> {
        Ok(SystemLogEntry::list_recent(&self.pool).await?)
    }

    async fn add_system_log(&self, level: LogLevel, component: &str, message: &str) -> StoreResult<()> {
        Ok(SystemLogEntry::insert(&self.pool, level, component, message).await?)
    }

    async fn get_system_config(&self) -> StoreResult<SystemConfig> {
        Ok(system_config::load(&self.pool).await?)
    }

    async fn update_system_config(&self, key: &str, value: &str) -> StoreResult<()> {
        Ok(system_config::upsert(&self.pool, key, value).await?)
    }
}

//! Sensor Manager
//!
//! Owns the sensor's identity, its connection to HQ and the heartbeat loop.
//! The loop runs as a tokio task; stopping or restarting aborts it.
//!
//! Health is a 0-100 score. After a successful heartbeat it blends the
//! success rate (70%) with a latency score that reaches zero at 5 s (30%).
//! After a failure it is the success rate alone.
//!
//! Synced policies are compiled into a [`PolicyMatcher`]; content handed to
//! [`SensorManager::inspect_content`] is checked against it and matches are
//! reported to HQ as alerts.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::client::{AlertEvent, HeartbeatRequest, HqClient, HqError, PolicyRule, SensorCommand};
use crate::config::{config_path, SensorConfig};
use crate::constants;
use crate::dlp::{DlpAction, DlpMatch, PolicyMatcher};
use crate::identity::IdentityStorage;

/// Commands kept for the status view
const RECENT_COMMAND_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionStatus {
    Online,
    Offline,
}

/// Snapshot handed to the desktop UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStatusReport {
    pub sensor_id: Option<String>,
    pub hostname: String,
    pub version: String,
    pub hq_server_url: String,
    pub connection_status: ConnectionStatus,
    pub last_heartbeat: Option<String>,
    pub heartbeat_count: u64,
    pub success_count: u64,
    /// Seconds
    pub last_latency: Option<f64>,
    pub system_health: f64,
    pub policies: Vec<PolicyRule>,
    pub policy_version: Option<String>,
    pub recent_commands: Vec<SensorCommand>,
    pub global_stats: Option<serde_json::Value>,
    pub recent_alerts: Vec<serde_json::Value>,
}

#[derive(Debug)]
struct ManagerState {
    sensor_id: Option<String>,
    hq_server_url: String,
    connection_status: ConnectionStatus,
    last_heartbeat: Option<DateTime<Utc>>,
    heartbeat_count: u64,
    success_count: u64,
    last_latency: Option<f64>,
    system_health: f64,
    policies: Vec<PolicyRule>,
    matcher: PolicyMatcher,
    policy_version: Option<String>,
    recent_commands: Vec<SensorCommand>,
    global_stats: Option<serde_json::Value>,
    recent_alerts: Vec<serde_json::Value>,
    /// Last content inspected, so unchanged content is not re-reported
    last_inspected: Option<String>,
    is_running: bool,
}

impl ManagerState {
    fn success_rate(&self) -> f64 {
        if self.heartbeat_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.heartbeat_count as f64
        }
    }
}

pub fn health_after_success(success_rate: f64, latency_secs: f64) -> f64 {
    let latency_score = (1.0 - latency_secs / 5.0).max(0.0);
    (success_rate * 0.7 + latency_score * 0.3) * 100.0
}

pub fn health_after_failure(success_rate: f64) -> f64 {
    success_rate * 100.0
}

/// Retry delay after a failed heartbeat
pub fn next_backoff(current: Duration) -> Duration {
    current
        .mul_f64(1.5)
        .min(Duration::from_secs(constants::MAX_BACKOFF_SECS))
}

/// Saved URL first, then the well-known local hosts, without repeats
pub fn discovery_candidates(saved: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for url in saved.into_iter().chain(constants::DISCOVERY_CANDIDATES) {
        if !candidates.iter().any(|c| c == url) {
            candidates.push(url.to_string());
        }
    }
    candidates
}

struct Inner {
    data_dir: PathBuf,
    hostname: String,
    version: String,
    heartbeat_interval: Duration,
    client: HqClient,
    state: RwLock<ManagerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap to clone; all clones drive the same sensor
#[derive(Clone)]
pub struct SensorManager {
    inner: Arc<Inner>,
}

impl SensorManager {
    pub fn new(hq_server_url: String, data_dir: PathBuf) -> Result<Self, HqError> {
        Self::with_interval(hq_server_url, data_dir, constants::get_heartbeat_interval())
    }

    pub fn with_interval(
        hq_server_url: String,
        data_dir: PathBuf,
        heartbeat_interval: Duration,
    ) -> Result<Self, HqError> {
        let client = HqClient::new(&hq_server_url)?;

        Ok(Self {
            inner: Arc::new(Inner {
                data_dir,
                hostname: constants::get_hostname(),
                version: constants::APP_VERSION.to_string(),
                heartbeat_interval,
                client,
                state: RwLock::new(ManagerState {
                    sensor_id: None,
                    hq_server_url,
                    connection_status: ConnectionStatus::Offline,
                    last_heartbeat: None,
                    heartbeat_count: 0,
                    success_count: 0,
                    last_latency: None,
                    system_health: 0.0,
                    policies: Vec::new(),
                    matcher: PolicyMatcher::default(),
                    policy_version: None,
                    recent_commands: Vec::new(),
                    global_stats: None,
                    recent_alerts: Vec::new(),
                    last_inspected: None,
                    is_running: false,
                }),
                task: Mutex::new(None),
            }),
        })
    }

    /// Load identity and config, find HQ, then start the heartbeat loop
    pub async fn start(&self) {
        self.load_identity();
        self.load_config();

        log::info!("Starting HQ discovery...");
        let saved = self.hq_server_url();
        match self.discover(Some(&saved)).await {
            Some(found) => {
                log::info!("Connected to HQ at {}", found);
                self.inner.state.write().hq_server_url = found;
                self.save_config();
            }
            None => log::warn!("Could not auto-discover HQ. Using {}", saved),
        }

        self.inner.state.write().is_running = true;

        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.run_loop().await });
        if let Some(previous) = self.inner.task.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        self.inner.state.write().is_running = false;
        if let Some(handle) = self.inner.task.lock().take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.read().is_running
    }

    async fn run_loop(&self) {
        let base = self.inner.heartbeat_interval;
        let mut delay = base;
        let mut announced = false;

        loop {
            match self.send_heartbeat().await {
                Ok(()) => {
                    delay = base;
                    if !announced {
                        announced = true;
                        self.announce_startup().await;
                    }
                }
                Err(e) => {
                    delay = next_backoff(delay);
                    log::warn!("Heartbeat failed: {} (retry in {:.1}s)", e, delay.as_secs_f64());
                }
            }
            self.refresh_dashboard().await;
            tokio::time::sleep(delay).await;
        }
    }

    /// Tell HQ the sensor is up, once per start, after the first good heartbeat
    async fn announce_startup(&self) {
        let metadata = serde_json::json!({
            "message": "Sensor service initialized",
            "version": self.inner.version,
        });
        if let Err(e) = self.send_alert("SYSTEM_STARTUP", metadata).await {
            log::warn!("Failed to send startup alert: {}", e);
        }
    }

    fn load_identity(&self) {
        let storage = IdentityStorage::new(&self.inner.data_dir);
        let sensor_id = match storage.load_or_create() {
            Ok(id) => id,
            Err(e) => {
                log::error!("Failed to persist sensor id, using a session id: {}", e);
                uuid::Uuid::new_v4().to_string()
            }
        };
        self.inner.state.write().sensor_id = Some(sensor_id);
    }

    fn load_config(&self) {
        let config = SensorConfig::load(&config_path(&self.inner.data_dir));
        let mut state = self.inner.state.write();
        if let Some(url) = config.hq_server_url {
            log::info!("Loaded saved HQ URL: {}", url);
            state.hq_server_url = url;
        }
        if config.policy_version.is_some() {
            state.policy_version = config.policy_version;
        }
    }

    fn save_config(&self) {
        let config = {
            let state = self.inner.state.read();
            SensorConfig {
                hq_server_url: Some(state.hq_server_url.clone()),
                policy_version: state.policy_version.clone(),
            }
        };
        if let Err(e) = config.save(&config_path(&self.inner.data_dir)) {
            log::error!("Failed to save config: {}", e);
        }
    }

    /// First candidate whose health check reports HEALTHY
    pub async fn discover(&self, saved: Option<&str>) -> Option<String> {
        let candidates = discovery_candidates(saved);
        log::debug!("Probing HQ candidates: {:?}", candidates);

        let timeout = Duration::from_millis(constants::DISCOVERY_TIMEOUT_MS);
        for url in candidates {
            match self.inner.client.at(&url).health_check(timeout).await {
                Ok(health) if health.status == "HEALTHY" => return Some(url),
                Ok(health) => log::debug!("{} answered {}", url, health.status),
                Err(e) => log::debug!("{} unreachable: {}", url, e),
            }
        }
        None
    }

    /// One heartbeat round trip, with all bookkeeping applied
    pub async fn send_heartbeat(&self) -> Result<(), HqError> {
        let (client, request) = {
            let state = self.inner.state.read();
            (
                self.inner.client.at(&state.hq_server_url),
                HeartbeatRequest {
                    id: state.sensor_id.clone().unwrap_or_default(),
                    hostname: self.inner.hostname.clone(),
                    version: self.inner.version.clone(),
                    policy_version: state.policy_version.clone(),
                },
            )
        };

        let started = Instant::now();
        let result = client.heartbeat(&request).await;
        let latency = started.elapsed().as_secs_f64();

        let mut policy_changed = false;
        {
            let mut state = self.inner.state.write();
            state.heartbeat_count += 1;
            state.last_heartbeat = Some(Utc::now());

            match &result {
                Ok(reply) => {
                    state.success_count += 1;
                    state.connection_status = ConnectionStatus::Online;
                    state.last_latency = Some(latency);

                    if let Some(policies) = &reply.policies {
                        log::info!(
                            "Policy update: {} -> {}",
                            state.policy_version.as_deref().unwrap_or("None"),
                            reply.policy_version
                        );
                        state.matcher = PolicyMatcher::compile(policies);
                        state.policies = policies.clone();
                        state.policy_version = Some(reply.policy_version.clone());
                        policy_changed = true;
                    }

                    for command in &reply.commands {
                        log::info!("Received {} command ({})", command.command_type, command.id);
                        state.recent_commands.insert(0, command.clone());
                    }
                    state.recent_commands.truncate(RECENT_COMMAND_LIMIT);

                    state.system_health = health_after_success(state.success_rate(), latency);
                    log::debug!("Heartbeat sent. Latency: {:.0}ms", latency * 1000.0);
                }
                Err(_) => {
                    state.connection_status = ConnectionStatus::Offline;
                    state.system_health = health_after_failure(state.success_rate());
                }
            }
        }

        if policy_changed {
            self.save_config();
        }
        result.map(|_| ())
    }

    async fn refresh_dashboard(&self) {
        let client = self.inner.client.at(&self.hq_server_url());

        match client.global_stats().await {
            Ok(stats) => self.inner.state.write().global_stats = Some(stats),
            Err(e) => log::debug!("Failed to fetch global stats: {}", e),
        }
        match client.recent_alerts(constants::RECENT_ALERT_LIMIT).await {
            Ok(alerts) => self.inner.state.write().recent_alerts = alerts,
            Err(e) => log::debug!("Failed to fetch recent alerts: {}", e),
        }
    }

    /// Report a local detection to HQ
    pub async fn send_alert(&self, event_type: &str, metadata: serde_json::Value) -> Result<String, HqError> {
        let (client, sensor_id) = {
            let state = self.inner.state.read();
            (
                self.inner.client.at(&state.hq_server_url),
                state.sensor_id.clone().unwrap_or_default(),
            )
        };

        let event = AlertEvent {
            id: uuid::Uuid::new_v4().to_string(),
            sensor_id,
            event_type: event_type.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            hostname: self.inner.hostname.clone(),
            metadata,
        };

        let ack = client.report_alert(&event).await?;
        log::info!("Alert sent: {} ({})", event_type, ack.id);
        Ok(ack.id)
    }

    /// Check content against the synced policies and report the first match.
    /// A `Block` verdict tells the caller to clear the content.
    /// Nothing is checked while stopped, without policies, or when the
    /// content equals the last content inspected.
    pub async fn inspect_content(&self, content: &str) -> Option<DlpMatch> {
        let found = {
            let mut state = self.inner.state.write();
            if !state.is_running
                || state.matcher.is_empty()
                || content.is_empty()
                || state.last_inspected.as_deref() == Some(content)
            {
                return None;
            }
            state.last_inspected = Some(content.to_string());

            let found = state.matcher.evaluate(content)?;
            if found.action == DlpAction::Block {
                // cleared content must be checked again if it comes back
                state.last_inspected = None;
            }
            found
        };

        log::info!("DLP match: {} ({:?})", found.policy_name, found.action);
        let metadata = found.alert_metadata(content, &self.inner.hostname);
        if let Err(e) = self.send_alert(found.event_type(), metadata).await {
            log::error!("Failed to send alert: {}", e);
        }
        Some(found)
    }

    pub fn status(&self) -> SensorStatusReport {
        let state = self.inner.state.read();
        SensorStatusReport {
            sensor_id: state.sensor_id.clone(),
            hostname: self.inner.hostname.clone(),
            version: self.inner.version.clone(),
            hq_server_url: state.hq_server_url.clone(),
            connection_status: state.connection_status,
            last_heartbeat: state.last_heartbeat.map(|t| t.to_rfc3339()),
            heartbeat_count: state.heartbeat_count,
            success_count: state.success_count,
            last_latency: state.last_latency,
            system_health: state.system_health,
            policies: state.policies.clone(),
            policy_version: state.policy_version.clone(),
            recent_commands: state.recent_commands.clone(),
            global_stats: state.global_stats.clone(),
            recent_alerts: state.recent_alerts.clone(),
        }
    }

    pub fn sensor_id(&self) -> Option<String> {
        self.inner.state.read().sensor_id.clone()
    }

    pub fn hq_server_url(&self) -> String {
        self.inner.state.read().hq_server_url.clone()
    }

    /// Point the sensor at a new HQ. A running loop is restarted.
    pub async fn update_hq_server_url(&self, url: String) -> bool {
        log::info!("HQ server URL changed to {}", url);
        self.inner.state.write().hq_server_url = url;
        self.save_config();

        if self.is_running() {
            self.stop();
            self.start().await;
        }
        true
    }
}

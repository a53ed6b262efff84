//! Central Configuration Constants
//!
//! Single source of truth for sensor defaults. Each value can be overridden
//! from the environment through the helpers at the bottom of this file.

use std::path::PathBuf;
use std::time::Duration;

/// Default HQ server URL
pub const DEFAULT_HQ_URL: &str = "http://localhost:3000";

/// Hosts probed during discovery, after the saved URL
pub const DISCOVERY_CANDIDATES: [&str; 3] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://host.docker.internal:3000",
];

/// Per-candidate timeout while probing for HQ (milliseconds)
pub const DISCOVERY_TIMEOUT_MS: u64 = 1000;

/// Default heartbeat interval (seconds)
pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 5;

/// Upper bound for the heartbeat retry delay (seconds)
pub const MAX_BACKOFF_SECS: u64 = 30;

/// Request timeout for regular HQ calls (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Number of HQ alerts kept for the status view
pub const RECENT_ALERT_LIMIT: usize = 10;

/// Directory name under the platform data dir
pub const APP_DIR: &str = "sentinel-sensor";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get HQ server URL from environment or use default
pub fn get_hq_url() -> String {
    std::env::var("SENTINEL_HQ_URL")
        .unwrap_or_else(|_| DEFAULT_HQ_URL.to_string())
}

/// Get heartbeat interval from environment or use default
pub fn get_heartbeat_interval() -> Duration {
    let secs = std::env::var("SENTINEL_HEARTBEAT_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|s: &u64| *s > 0)
        .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);
    Duration::from_secs(secs)
}

/// Directory holding `sensor-id.json` and `config.json`
pub fn get_data_dir() -> PathBuf {
    std::env::var("SENTINEL_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
}

/// Host name reported in heartbeats
pub fn get_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

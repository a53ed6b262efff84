//! Sensor Identity
//!
//! A sensor keeps one id for its whole life. The id is generated on first
//! start and stored as `{"sensorId": "<uuid>"}` in `sensor-id.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const IDENTITY_FILE: &str = "sensor-id.json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityFile {
    sensor_id: String,
}

/// Identity storage manager
pub struct IdentityStorage {
    file_path: PathBuf,
}

impl IdentityStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            file_path: data_dir.join(IDENTITY_FILE),
        }
    }

    /// Check if identity file exists
    pub fn exists(&self) -> bool {
        self.file_path.exists()
    }

    pub fn load(&self) -> Result<String, IdentityError> {
        let content = fs::read_to_string(&self.file_path)
            .map_err(|e| IdentityError::IoError(e.to_string()))?;

        let file: IdentityFile = serde_json::from_str(&content)
            .map_err(|e| IdentityError::ParseError(e.to_string()))?;

        if file.sensor_id.is_empty() {
            return Err(IdentityError::ParseError("empty sensorId".to_string()));
        }
        Ok(file.sensor_id)
    }

    /// Load the stored id, creating and saving a fresh one when none is usable
    pub fn load_or_create(&self) -> Result<String, IdentityError> {
        if self.exists() {
            match self.load() {
                Ok(id) => return Ok(id),
                Err(e) => log::warn!("Stored sensor id unreadable, issuing a new one: {}", e),
            }
        }

        let sensor_id = Uuid::new_v4().to_string();
        self.save(&sensor_id)?;
        log::info!("New sensor id issued: {}", sensor_id);
        Ok(sensor_id)
    }

    fn save(&self, sensor_id: &str) -> Result<(), IdentityError> {
        if let Some(dir) = self.file_path.parent() {
            fs::create_dir_all(dir).map_err(|e| IdentityError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string(&IdentityFile {
            sensor_id: sensor_id.to_string(),
        })
        .map_err(|e| IdentityError::ParseError(e.to_string()))?;

        fs::write(&self.file_path, content).map_err(|e| IdentityError::IoError(e.to_string()))
    }
}

/// Identity errors
#[derive(Debug, Clone)]
pub enum IdentityError {
    IoError(String),
    ParseError(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {}", e),
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for IdentityError {}

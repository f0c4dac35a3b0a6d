// ── JSON file repository ──
//
// The whole device list lives in one pretty-printed JSON array. A missing
// or blank file reads as an empty list; anything unreadable or unparseable
// is a storage error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use devtester_core::{CoreError, DeviceRecord, DeviceRepository};
use tracing::debug;

/// Default location, relative to the working directory.
pub const DEFAULT_DEVICES_FILE: &str = "DummyData/devices.json";

#[derive(Debug, Clone)]
pub struct JsonDeviceRepository {
    path: PathBuf,
}

impl Default for JsonDeviceRepository {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICES_FILE)
    }
}

impl JsonDeviceRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, message: impl ToString) -> CoreError {
        CoreError::Storage {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl DeviceRepository for JsonDeviceRepository {
    async fn load_devices(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no devices file, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.storage_error(e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let devices: Vec<DeviceRecord> =
            serde_json::from_str(&text).map_err(|e| self.storage_error(e))?;
        debug!(path = %self.path.display(), count = devices.len(), "devices loaded");
        Ok(devices)
    }

    async fn save_devices(&self, devices: &[DeviceRecord]) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.storage_error(e))?;
            }
        }
        let json = serde_json::to_string_pretty(devices).map_err(|e| self.storage_error(e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.storage_error(e))?;
        debug!(path = %self.path.display(), count = devices.len(), "devices saved");
        Ok(())
    }
}

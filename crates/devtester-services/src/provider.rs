// ── File-cycling data provider ──
//
// Static and one-shot dynamic payloads are read from fixed files. Live
// updates cycle round-robin through a list of dynamic files on a fixed
// interval, from a spawned task that a `CancellationToken` stops.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use devtester_core::{
    CoreError, DeviceDataProvider, DeviceRecord, PayloadCallback, PayloadKind, PollPayload,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Where payloads come from and how often live updates tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDataProviderConfig {
    pub static_file: PathBuf,
    pub dynamic_file: PathBuf,
    /// Cycled in order by live updates. Must not be empty.
    pub dynamic_files: Vec<PathBuf>,
    pub interval: Duration,
}

impl Default for JsonDataProviderConfig {
    fn default() -> Self {
        let dir = Path::new("DummyData");
        Self {
            static_file: dir.join("StaticData.json"),
            dynamic_file: dir.join("DynamicData1.json"),
            dynamic_files: [2, 3, 4, 5, 1]
                .iter()
                .map(|n| dir.join(format!("DynamicData{n}.json")))
                .collect(),
            interval: Duration::from_millis(2000),
        }
    }
}

pub struct JsonDeviceDataProvider {
    config: JsonDataProviderConfig,
    files: Arc<[PathBuf]>,
    active: Mutex<Option<CancellationToken>>,
}

impl JsonDeviceDataProvider {
    /// Fails when the dynamic file list is empty or the interval is zero.
    pub fn new(config: JsonDataProviderConfig) -> Result<Self, CoreError> {
        if config.dynamic_files.is_empty() {
            return Err(CoreError::Config {
                message: "dynamic file list cannot be empty".into(),
            });
        }
        if config.interval.is_zero() {
            return Err(CoreError::Config {
                message: "polling interval must be greater than zero".into(),
            });
        }
        let files: Arc<[PathBuf]> = config.dynamic_files.clone().into();
        Ok(Self {
            config,
            files,
            active: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &JsonDataProviderConfig {
        &self.config
    }

    pub fn is_polling(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn cancel_active(&self) -> bool {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        previous.map(|token| token.cancel()).is_some()
    }
}

async fn read_payload(path: &Path, kind: PayloadKind) -> Result<String, CoreError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            CoreError::PayloadNotFound {
                kind,
                message: path.display().to_string(),
            }
        } else {
            CoreError::Provider {
                message: format!("failed to read {}: {e}", path.display()),
            }
        }
    })
}

#[async_trait]
impl DeviceDataProvider for JsonDeviceDataProvider {
    async fn get_static(&self, device: &DeviceRecord) -> Result<String, CoreError> {
        debug!(device_id = device.device_id(), path = %self.config.static_file.display(), "reading static payload");
        read_payload(&self.config.static_file, PayloadKind::Static).await
    }

    async fn get_dynamic_once(&self, device: &DeviceRecord) -> Result<String, CoreError> {
        debug!(device_id = device.device_id(), path = %self.config.dynamic_file.display(), "reading dynamic payload");
        read_payload(&self.config.dynamic_file, PayloadKind::Dynamic).await
    }

    fn start_polling(
        &self,
        device: &DeviceRecord,
        callback: PayloadCallback,
    ) -> Result<(), CoreError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| CoreError::Provider {
            message: format!("polling requires a tokio runtime: {e}"),
        })?;

        if self.cancel_active() {
            debug!("replacing previous polling subscription");
        }
        let cancel = CancellationToken::new();
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());

        handle.spawn(polling_task(
            Arc::clone(&self.files),
            self.config.interval,
            callback,
            cancel,
        ));
        debug!(
            device_id = device.device_id(),
            files = self.files.len(),
            interval_ms = self.config.interval.as_millis(),
            "polling started"
        );
        Ok(())
    }

    fn stop_polling(&self, device: &DeviceRecord) {
        if self.cancel_active() {
            debug!(device_id = device.device_id(), "polling stopped");
        }
    }
}

impl Drop for JsonDeviceDataProvider {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

/// Deliver the next file on every tick until cancelled. The first
/// delivery happens one interval after start.
async fn polling_task(
    files: Arc<[PathBuf]>,
    period: Duration,
    callback: PayloadCallback,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick
    let mut index = 0usize;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(path) = files.get(index) else { break };
                index = (index + 1) % files.len();
                let payload = read_dynamic_file(path).await;
                if cancel.is_cancelled() {
                    break;
                }
                callback(payload);
            }
        }
    }
}

async fn read_dynamic_file(path: &Path) -> PollPayload {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => PollPayload::Data(content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "dynamic file missing");
            PollPayload::Error(format!("Error: Dynamic file not found: {}", path.display()))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "dynamic file unreadable");
            PollPayload::Error(format!("Error reading dynamic file: {e}"))
        }
    }
}

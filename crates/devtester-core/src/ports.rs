// ── Collaborator contracts ──
//
// Everything the orchestrator consumes from outside: persistence, the
// device data provider, and the delete confirmation gate. Implementations
// are passed in at construction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::DeviceRecord;

/// One delivery from a polling subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollPayload {
    /// Raw payload text, reformatted before display.
    Data(String),
    /// Provider-side failure text, displayed as-is.
    Error(String),
}

/// Invoked by the provider on every polling tick, from its own task.
pub type PayloadCallback = Arc<dyn Fn(PollPayload) + Send + Sync>;

/// Durable storage for the ordered device list.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Load the persisted list. An absent store is an empty list.
    async fn load_devices(&self) -> Result<Vec<DeviceRecord>, CoreError>;

    /// Replace the persisted list with `devices`, order preserved.
    async fn save_devices(&self, devices: &[DeviceRecord]) -> Result<(), CoreError>;
}

/// Source of static and dynamic payloads for a device.
#[async_trait]
pub trait DeviceDataProvider: Send + Sync {
    async fn get_static(&self, device: &DeviceRecord) -> Result<String, CoreError>;

    async fn get_dynamic_once(&self, device: &DeviceRecord) -> Result<String, CoreError>;

    /// Begin invoking `callback` at the provider's own cadence until
    /// stopped. Starting again must first stop any prior subscription.
    fn start_polling(&self, device: &DeviceRecord, callback: PayloadCallback)
    -> Result<(), CoreError>;

    /// Stop the subscription. A no-op when none is active.
    fn stop_polling(&self, device: &DeviceRecord);
}

/// Asks the user before a record is removed.
pub trait DeleteConfirmation: Send + Sync {
    fn confirm_delete(&self, device: &DeviceRecord) -> bool;
}

/// Confirmation gate that always agrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl DeleteConfirmation for AlwaysConfirm {
    fn confirm_delete(&self, _device: &DeviceRecord) -> bool {
        true
    }
}

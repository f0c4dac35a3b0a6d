// Shared in-memory collaborators for orchestrator tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use devtester_core::{
    AlwaysConfirm, Collaborators, CoreError, DeleteConfirmation, DeviceDataProvider,
    DeviceOrchestrator, DeviceRecord, DeviceRepository, FieldUpdate, Notification,
    NotificationRouter, OrchestratorConfig, PayloadCallback, PayloadKind, PollPayload, ViewFilter,
};

// ── Repository ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryRepository {
    pub stored: Mutex<Vec<DeviceRecord>>,
    pub saves: Mutex<usize>,
    pub fail_load: Mutex<bool>,
    pub fail_save: Mutex<bool>,
}

impl MemoryRepository {
    pub fn with(devices: Vec<DeviceRecord>) -> Arc<Self> {
        let repo = Self::default();
        *repo.stored.lock().unwrap() = devices;
        Arc::new(repo)
    }

    pub fn stored_ids(&self) -> Vec<String> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.device_id().to_owned())
            .collect()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl DeviceRepository for MemoryRepository {
    async fn load_devices(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        if *self.fail_load.lock().unwrap() {
            return Err(CoreError::Storage {
                path: "memory".into(),
                message: "unreadable".into(),
            });
        }
        Ok(self.stored.lock().unwrap().iter().map(DeviceRecord::deep_copy).collect())
    }

    async fn save_devices(&self, devices: &[DeviceRecord]) -> Result<(), CoreError> {
        *self.saves.lock().unwrap() += 1;
        if *self.fail_save.lock().unwrap() {
            return Err(CoreError::Storage {
                path: "memory".into(),
                message: "disk full".into(),
            });
        }
        *self.stored.lock().unwrap() = devices.iter().map(DeviceRecord::deep_copy).collect();
        Ok(())
    }
}

// ── Data provider ───────────────────────────────────────────────────

/// Serves fixed payloads and lets the test drive polling deliveries.
#[derive(Default)]
pub struct ScriptedProvider {
    pub static_payloads: Mutex<HashMap<String, String>>,
    pub dynamic_payloads: Mutex<HashMap<String, String>>,
    pub callback: Mutex<Option<PayloadCallback>>,
    pub polling_for: Mutex<Option<String>>,
    pub starts: Mutex<usize>,
    pub stops: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn push(&self, payload: PollPayload) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(payload);
        }
    }

    pub fn polling_for(&self) -> Option<String> {
        self.polling_for.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceDataProvider for ScriptedProvider {
    async fn get_static(&self, device: &DeviceRecord) -> Result<String, CoreError> {
        self.static_payloads
            .lock()
            .unwrap()
            .get(device.device_id())
            .cloned()
            .ok_or_else(|| CoreError::PayloadNotFound {
                kind: PayloadKind::Static,
                message: device.device_id().to_owned(),
            })
    }

    async fn get_dynamic_once(&self, device: &DeviceRecord) -> Result<String, CoreError> {
        self.dynamic_payloads
            .lock()
            .unwrap()
            .get(device.device_id())
            .cloned()
            .ok_or_else(|| CoreError::PayloadNotFound {
                kind: PayloadKind::Dynamic,
                message: device.device_id().to_owned(),
            })
    }

    fn start_polling(
        &self,
        device: &DeviceRecord,
        callback: PayloadCallback,
    ) -> Result<(), CoreError> {
        *self.starts.lock().unwrap() += 1;
        *self.callback.lock().unwrap() = Some(callback);
        *self.polling_for.lock().unwrap() = Some(device.device_id().to_owned());
        Ok(())
    }

    fn stop_polling(&self, _device: &DeviceRecord) {
        *self.stops.lock().unwrap() += 1;
        *self.callback.lock().unwrap() = None;
        *self.polling_for.lock().unwrap() = None;
    }
}

// ── Confirmation ────────────────────────────────────────────────────

pub struct Decline;

impl DeleteConfirmation for Decline {
    fn confirm_delete(&self, _device: &DeviceRecord) -> bool {
        false
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub orchestrator: DeviceOrchestrator,
    pub repository: Arc<MemoryRepository>,
    pub provider: Arc<ScriptedProvider>,
    pub notifications: Arc<NotificationRouter>,
    pub seen: Arc<Mutex<Vec<Notification>>>,
}

impl Harness {
    pub fn new(devices: Vec<DeviceRecord>) -> Self {
        Self::build(devices, Arc::new(AlwaysConfirm), OrchestratorConfig::default())
    }

    pub fn build(
        devices: Vec<DeviceRecord>,
        confirmation: Arc<dyn DeleteConfirmation>,
        config: OrchestratorConfig,
    ) -> Self {
        let repository = MemoryRepository::with(devices);
        let provider = Arc::new(ScriptedProvider::default());
        let notifications = Arc::new(NotificationRouter::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        notifications.subscribe(ViewFilter::Any, move |n: &Notification| {
            sink.lock().unwrap().push(n.clone());
        });

        let orchestrator = DeviceOrchestrator::new(
            config,
            Collaborators {
                repository: repository.clone(),
                data_provider: provider.clone(),
                notifications: Arc::clone(&notifications),
                confirmation,
            },
        );
        Self {
            orchestrator,
            repository,
            provider,
            notifications,
            seen,
        }
    }

    /// Script authentication outcomes, cycling when exhausted.
    pub fn with_outcomes(mut self, outcomes: &[bool]) -> Self {
        self.orchestrator = self.orchestrator.with_auth_decider(scripted(outcomes));
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }

    pub fn last_message(&self) -> Option<String> {
        self.seen.lock().unwrap().last().map(|n| n.message.clone())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub const ID_A: &str = "11111111-1111-1111-1111-111111111111";
pub const ID_B: &str = "22222222-2222-2222-2222-222222222222";

pub fn device(id: &str, ip: &str, authenticated: Option<bool>) -> DeviceRecord {
    let mut d = DeviceRecord::new();
    d.set_device_id(id);
    d.set_solution_id("33333333-3333-3333-3333-333333333333");
    d.set_device_name("Device Redfish");
    d.set_ip_address(ip);
    d.set_port("9000");
    d.set_username("admin");
    d.set_password("secret");
    d.set_is_authenticated(authenticated);
    d
}

/// Fill the form with a valid new record.
pub fn fill_form(orchestrator: &mut DeviceOrchestrator, ip: &str) {
    orchestrator.update_form(FieldUpdate::IpAddress(ip.into()));
    orchestrator.update_form(FieldUpdate::Username("admin".into()));
    orchestrator.update_form(FieldUpdate::Password("secret".into()));
}

/// Deterministic outcome source cycling through `outcomes`.
pub fn scripted(outcomes: &[bool]) -> impl FnMut() -> bool + Send + Sync + 'static {
    let mut queue: VecDeque<bool> = outcomes.iter().copied().collect();
    move || {
        let next = queue.pop_front().unwrap_or(true);
        queue.push_back(next);
        next
    }
}

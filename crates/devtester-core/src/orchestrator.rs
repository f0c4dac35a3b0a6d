// ── Device orchestrator ──
//
// Composes the collection, edit form, busy registry, polling session and
// notification router behind a set of guarded commands. Commands take
// `&mut self`: all state mutation happens on the caller's task, and
// provider deliveries are drained from the polling channel on that same
// task.

use std::sync::Arc;

use strum::Display;
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::busy::{AUTHENTICATE, AUTHENTICATE_ALL, BusyRegistry, DYNAMIC_DATA, STATIC_DATA};
use crate::config::OrchestratorConfig;
use crate::error::CoreError;
use crate::form::{DeviceForm, FieldUpdate};
use crate::model::{DeviceField, DeviceRecord};
use crate::notify::{
    Notification, NotificationRouter, VIEW_DEVICE_DETAILS, VIEW_DEVICE_FORM, VIEW_DEVICE_LIST,
};
use crate::polling::{PollingSession, format_dynamic};
use crate::ports::{DeleteConfirmation, DeviceDataProvider, DeviceRepository};
use crate::store::{DeviceCollection, SaveOutcome};

const EVENT_CHANNEL_SIZE: usize = 256;

/// Source of simulated authentication outcomes.
pub type AuthDecider = Box<dyn FnMut() -> bool + Send + Sync>;

// ── Public types ─────────────────────────────────────────────────

/// External services handed to the orchestrator at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn DeviceRepository>,
    pub data_provider: Arc<dyn DeviceDataProvider>,
    pub notifications: Arc<NotificationRouter>,
    pub confirmation: Arc<dyn DeleteConfirmation>,
}

/// The commands the orchestrator exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CommandKind {
    Save,
    Clear,
    Authenticate,
    Delete,
    FetchStatic,
    FetchDynamic,
    ManageResources,
}

/// State changes a binding layer can react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    DevicesChanged,
    SelectionChanged(Option<String>),
    FormReplaced,
    FormChanged(DeviceField),
    /// Full validation ran and the form's error set was refreshed.
    FormValidated,
    PortsChanged,
    PayloadChanged,
    ErrorMessageChanged,
    CommandStatesChanged,
}

/// How a save attempt ended. Never an error: rejections land on the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Saved(SaveOutcome),
    Duplicate,
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted,
    Cancelled,
}

/// Resource descriptors entered through the manage-resources command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInputs {
    pub static_resource: String,
    pub dynamic_resource: String,
}

// ── DeviceOrchestrator ───────────────────────────────────────────

pub struct DeviceOrchestrator {
    config: OrchestratorConfig,
    repository: Arc<dyn DeviceRepository>,
    provider: Arc<dyn DeviceDataProvider>,
    notifications: Arc<NotificationRouter>,
    confirmation: Arc<dyn DeleteConfirmation>,
    collection: DeviceCollection,
    form: DeviceForm,
    busy: Arc<BusyRegistry>,
    polling: PollingSession,
    payload: watch::Sender<Option<String>>,
    resources: ResourceInputs,
    decide: AuthDecider,
    events: broadcast::Sender<OrchestratorEvent>,
}

impl DeviceOrchestrator {
    /// Build an orchestrator with an empty list. Call
    /// [`initialize`](Self::initialize) to load and bulk-authenticate.
    pub fn new(config: OrchestratorConfig, collaborators: Collaborators) -> Self {
        let (payload, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            config,
            repository: collaborators.repository,
            polling: PollingSession::new(Arc::clone(&collaborators.data_provider)),
            provider: collaborators.data_provider,
            notifications: collaborators.notifications,
            confirmation: collaborators.confirmation,
            collection: DeviceCollection::new(),
            form: DeviceForm::new(),
            busy: Arc::new(BusyRegistry::new()),
            payload,
            resources: ResourceInputs::default(),
            decide: Box::new(rand::random::<bool>),
            events,
        }
    }

    /// Replace the authentication outcome source.
    pub fn with_auth_decider<F>(mut self, decide: F) -> Self
    where
        F: FnMut() -> bool + Send + Sync + 'static,
    {
        self.decide = Box::new(decide);
        self
    }

    /// Startup workflow: load the persisted list and bulk-authenticate it.
    /// Returns `false` if the list could not be loaded.
    pub async fn initialize(&mut self) -> bool {
        info!("initializing device orchestrator");
        self.load_all(true).await
    }

    /// Stop any live subscription.
    pub fn shutdown(&mut self) {
        if self.polling.stop() {
            info!("polling stopped on shutdown");
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        self.collection.devices()
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.collection.get(device_id)
    }

    pub fn selected(&self) -> Option<&DeviceRecord> {
        self.collection.selected()
    }

    pub fn form(&self) -> &DeviceForm {
        &self.form
    }

    pub fn busy(&self) -> &Arc<BusyRegistry> {
        &self.busy
    }

    pub fn notifications(&self) -> &Arc<NotificationRouter> {
        &self.notifications
    }

    /// Currently displayed static or dynamic payload.
    pub fn payload(&self) -> Option<String> {
        self.payload.borrow().clone()
    }

    pub fn resources(&self) -> &ResourceInputs {
        &self.resources
    }

    pub fn is_polling(&self) -> bool {
        self.polling.is_active()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    pub fn watch_payload(&self) -> watch::Receiver<Option<String>> {
        self.payload.subscribe()
    }

    pub fn watch_devices(&self) -> watch::Receiver<Arc<Vec<DeviceRecord>>> {
        self.collection.watch_devices()
    }

    // ── Guards ───────────────────────────────────────────────────

    pub fn can_save(&self) -> bool {
        self.form.record().can_save()
    }

    pub fn can_authenticate(&self, device_id: &str) -> bool {
        self.collection.contains(device_id) && !self.busy.any_loading()
    }

    pub fn can_delete(&self, device_id: &str) -> bool {
        self.collection.contains(device_id)
    }

    /// Shared guard for fetch-static, fetch-dynamic and manage-resources.
    pub fn can_fetch(&self) -> bool {
        self.fetch_target(CommandKind::FetchStatic).is_ok()
    }

    /// Whether `command` would run now. `target` is the device a
    /// per-device command applies to.
    pub fn is_enabled(&self, command: CommandKind, target: Option<&str>) -> bool {
        match command {
            CommandKind::Save => self.can_save(),
            CommandKind::Clear => true,
            CommandKind::Authenticate => target.is_some_and(|id| self.can_authenticate(id)),
            CommandKind::Delete => target.is_some_and(|id| self.can_delete(id)),
            CommandKind::FetchStatic | CommandKind::FetchDynamic | CommandKind::ManageResources => {
                self.can_fetch()
            }
        }
    }

    fn fetch_target(&self, command: CommandKind) -> Result<DeviceRecord, CoreError> {
        let name = command.to_string();
        let Some(device) = self.collection.selected() else {
            return Err(CoreError::unavailable(&name, "No device selected."));
        };
        if device.is_authenticated() != Some(true) {
            return Err(CoreError::unavailable(&name, "device is not authenticated"));
        }
        if self.busy.any_loading() {
            return Err(CoreError::unavailable(&name, "another operation is in progress"));
        }
        Ok(device.deep_copy())
    }

    // ── Selection & form ─────────────────────────────────────────

    /// Select a device by identity, or clear the selection with `None`.
    /// Re-selecting the current device is a no-op and keeps form edits.
    pub fn select(&mut self, device_id: Option<&str>) -> Result<(), CoreError> {
        if self.collection.select(device_id)? {
            self.on_selection_changed();
        }
        Ok(())
    }

    /// Reaction to any selection change: stop polling, reload the form
    /// from an independent copy, and clear payload and error message.
    fn on_selection_changed(&mut self) {
        self.stop_live_updates();
        let record = self
            .collection
            .selected()
            .map(DeviceRecord::deep_copy)
            .unwrap_or_default();
        self.form.replace_record(record);
        self.set_error_message(None);

        let selected = self.collection.selected_id();
        debug!(selected = ?selected, "form reloaded for selection");
        self.emit(OrchestratorEvent::SelectionChanged(selected));
        self.emit(OrchestratorEvent::FormReplaced);
        self.emit(OrchestratorEvent::PortsChanged);
        self.emit(OrchestratorEvent::CommandStatesChanged);
    }

    /// Apply one edit to the form. Returns `true` if the record changed.
    pub fn update_form(&mut self, update: FieldUpdate) -> bool {
        let field = update.field();
        let reloads_ports = matches!(update, FieldUpdate::Agent(_));
        let changed = self.form.apply(update);
        if changed {
            self.emit(OrchestratorEvent::FormChanged(field));
            if reloads_ports {
                self.emit(OrchestratorEvent::PortsChanged);
            }
            self.emit(OrchestratorEvent::CommandStatesChanged);
        }
        changed
    }

    /// Reset the form to a fresh record on the first agent and port, and
    /// clear selection and error message.
    pub fn clear(&mut self) {
        self.collection.clear_selection();
        self.on_selection_changed();

        if let Some(agent) = self.form.available_agents().first().cloned() {
            self.update_form(FieldUpdate::Agent(agent));
        }
        if let Some(port) = self.form.available_ports().first().cloned() {
            self.update_form(FieldUpdate::Port(port));
        }
    }

    fn set_error_message(&mut self, message: Option<String>) {
        if self.form.set_error_message(message) {
            self.emit(OrchestratorEvent::ErrorMessageChanged);
        }
    }

    // ── Save / delete ────────────────────────────────────────────

    /// Commit the form's record into the list and persist.
    pub async fn save(&mut self) -> SaveResult {
        if !self.can_save() {
            let messages = self.form.record().validation_messages();
            self.form.record_mut().validate_all();
            self.emit(OrchestratorEvent::FormValidated);
            debug!(?messages, "save rejected by validation");
            return SaveResult::Invalid(messages);
        }

        let candidate = self.form.record().deep_copy();
        let outcome = match self.collection.save(&candidate) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "save rejected");
                let duplicate = matches!(err, CoreError::DuplicateDevice { .. });
                let message = err.to_string();
                self.set_error_message(Some(message.clone()));
                return if duplicate {
                    SaveResult::Duplicate
                } else {
                    SaveResult::Invalid(vec![message])
                };
            }
        };
        self.emit(OrchestratorEvent::DevicesChanged);
        self.persist().await;

        let text = match outcome {
            SaveOutcome::Created { .. } => "Device saved successfully!",
            SaveOutcome::Updated { .. } => "Device updated successfully!",
        };
        info!(device_id = outcome.device_id(), "{text}");
        self.notify(Notification::success(text).for_view(VIEW_DEVICE_FORM));
        self.clear();
        SaveResult::Saved(outcome)
    }

    /// Remove a device after the confirmation gate agrees.
    pub async fn delete(&mut self, device_id: &str) -> Result<DeleteResult, CoreError> {
        let Some(device) = self.collection.get(device_id) else {
            return Err(CoreError::unavailable(
                &CommandKind::Delete.to_string(),
                format!("no device with id {device_id}"),
            ));
        };
        if !self.confirmation.confirm_delete(device) {
            debug!(device_id, "delete cancelled");
            return Ok(DeleteResult::Cancelled);
        }

        let was_selected = self.collection.selected_id().as_deref() == Some(device_id);
        if self.polling.is_active_for(device_id) {
            self.stop_live_updates();
        }
        self.collection.remove(device_id);
        self.emit(OrchestratorEvent::DevicesChanged);
        self.persist().await;

        if was_selected {
            self.on_selection_changed();
        }
        info!(device_id, "device deleted");
        self.notify(Notification::success("Device deleted successfully").for_view(VIEW_DEVICE_LIST));
        Ok(DeleteResult::Deleted)
    }

    // ── Authentication ───────────────────────────────────────────

    /// Simulated authentication of one device. Returns the outcome.
    pub async fn authenticate(&mut self, device_id: &str) -> Result<bool, CoreError> {
        if !self.can_authenticate(device_id) {
            let reason = if self.collection.contains(device_id) {
                "another operation is in progress".to_owned()
            } else {
                format!("no device with id {device_id}")
            };
            return Err(CoreError::unavailable(
                &CommandKind::Authenticate.to_string(),
                reason,
            ));
        }

        let outcome = {
            let _busy = self.busy.begin(AUTHENTICATE);
            self.emit(OrchestratorEvent::CommandStatesChanged);
            self.collection.set_authenticated(device_id, None);
            self.emit(OrchestratorEvent::DevicesChanged);

            sleep(self.config.authenticate_delay).await;
            let outcome = (self.decide)();

            self.collection.set_authenticated(device_id, Some(outcome));
            if self.form.record().device_id() == device_id
                && self.form.record_mut().set_is_authenticated(Some(outcome))
            {
                self.emit(OrchestratorEvent::FormChanged(DeviceField::IsAuthenticated));
            }
            if !outcome {
                if self.polling.is_active_for(device_id) {
                    self.polling.stop();
                }
                if self.collection.selected_id().as_deref() == Some(device_id) {
                    self.set_payload(None);
                }
            }
            self.emit(OrchestratorEvent::DevicesChanged);
            self.persist().await;
            outcome
        };
        self.emit(OrchestratorEvent::CommandStatesChanged);

        info!(device_id, outcome, "authentication finished");
        let notification = if outcome {
            Notification::success("Authentication succeeded")
        } else {
            Notification::error("Authentication failed")
        };
        self.notify(notification.for_view(VIEW_DEVICE_LIST));
        Ok(outcome)
    }

    /// One shared delay, then an independent outcome per device.
    async fn authenticate_all(&mut self) {
        if self.collection.is_empty() {
            return;
        }
        {
            let _busy = self.busy.begin(AUTHENTICATE_ALL);
            self.emit(OrchestratorEvent::CommandStatesChanged);
            sleep(self.config.authenticate_all_delay).await;

            let decide = &mut self.decide;
            self.collection.set_all_authenticated(|| Some(decide()));
            self.sync_form_authentication();
            self.emit(OrchestratorEvent::DevicesChanged);
        }
        self.emit(OrchestratorEvent::CommandStatesChanged);
        info!(count = self.collection.len(), "bulk authentication finished");
    }

    fn sync_form_authentication(&mut self) {
        let state = self
            .collection
            .get(self.form.record().device_id())
            .map(DeviceRecord::is_authenticated);
        if let Some(state) = state {
            if self.form.record_mut().set_is_authenticated(state) {
                self.emit(OrchestratorEvent::FormChanged(DeviceField::IsAuthenticated));
            }
        }
    }

    // ── Loading & persistence ────────────────────────────────────

    /// Replace the list with the persisted one. The initial load also
    /// resets every record to unknown, bulk-authenticates and persists.
    ///
    /// Failures are reported as notifications; the return value only
    /// says whether the persisted list was read.
    pub async fn load_all(&mut self, initial: bool) -> bool {
        if self.collection.replace_all(Vec::new()) {
            self.on_selection_changed();
        }

        match self.repository.load_devices().await {
            Ok(mut devices) => {
                if initial {
                    for device in &mut devices {
                        device.set_is_authenticated(None);
                    }
                }
                info!(count = devices.len(), initial, "devices loaded");
                self.collection.replace_all(devices);
                self.emit(OrchestratorEvent::DevicesChanged);
            }
            Err(err) => {
                warn!(error = %err, "failed to load devices");
                self.report_storage_failure(&format!("Error loading devices: {err}"), initial);
                return false;
            }
        }

        if initial {
            self.authenticate_all().await;
            if let Err(err) = self.repository.save_devices(self.collection.devices()).await {
                warn!(error = %err, "failed to persist after bulk authentication");
                self.report_storage_failure(&format!("Error saving devices: {err}"), true);
            }
        }
        true
    }

    fn report_storage_failure(&mut self, message: &str, force_unauthenticated: bool) {
        if force_unauthenticated {
            self.collection.set_all_authenticated(|| Some(false));
            self.sync_form_authentication();
            self.emit(OrchestratorEvent::DevicesChanged);
        }
        self.notify(Notification::error(message));
    }

    /// Write the full list. Failures are reported, not returned.
    async fn persist(&mut self) -> bool {
        match self.repository.save_devices(self.collection.devices()).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to persist devices");
                self.notify(Notification::error(format!("Error saving devices: {err}")));
                false
            }
        }
    }

    // ── Data feeds ───────────────────────────────────────────────

    /// Fetch and display the selected device's static payload.
    pub async fn fetch_static(&mut self) -> Result<(), CoreError> {
        let device = self.fetch_target(CommandKind::FetchStatic)?;
        self.stop_live_updates();
        {
            let _busy = self.busy.begin(STATIC_DATA);
            self.emit(OrchestratorEvent::CommandStatesChanged);
            sleep(self.config.static_fetch_delay).await;

            match self.provider.get_static(&device).await {
                Ok(payload) => self.set_payload(Some(payload)),
                Err(err) => {
                    warn!(device_id = device.device_id(), error = %err, "static fetch failed");
                    self.set_payload(Some(err.to_string()));
                    self.notify(Notification::warning(err.to_string()).for_view(VIEW_DEVICE_DETAILS));
                }
            }
        }
        self.emit(OrchestratorEvent::CommandStatesChanged);
        Ok(())
    }

    /// Fetch the dynamic payload once, then subscribe to live updates.
    pub async fn fetch_dynamic(&mut self) -> Result<(), CoreError> {
        let device = self.fetch_target(CommandKind::FetchDynamic)?;
        self.stop_live_updates();
        let fetched = {
            let _busy = self.busy.begin(DYNAMIC_DATA);
            self.emit(OrchestratorEvent::CommandStatesChanged);
            sleep(self.config.dynamic_fetch_delay).await;

            match self.provider.get_dynamic_once(&device).await {
                Ok(raw) => {
                    self.set_payload(Some(format_dynamic(&raw)));
                    true
                }
                Err(err) => {
                    warn!(device_id = device.device_id(), error = %err, "dynamic fetch failed");
                    self.set_payload(Some(err.to_string()));
                    self.notify(Notification::warning(err.to_string()).for_view(VIEW_DEVICE_DETAILS));
                    false
                }
            }
        };
        self.emit(OrchestratorEvent::CommandStatesChanged);

        if fetched {
            if let Err(err) = self.polling.start(&device) {
                warn!(device_id = device.device_id(), error = %err, "could not start polling");
                self.notify(Notification::error(err.to_string()).for_view(VIEW_DEVICE_DETAILS));
            }
        }
        Ok(())
    }

    /// Store resource descriptors for the selected device.
    pub fn manage_resources(&mut self, inputs: ResourceInputs) -> Result<(), CoreError> {
        self.fetch_target(CommandKind::ManageResources)?;
        debug!(?inputs, "resource inputs saved");
        self.resources = inputs;
        self.notify(Notification::info("Configurations saved").for_view(VIEW_DEVICE_DETAILS));
        Ok(())
    }

    /// Stop the live subscription and clear the displayed payload.
    pub fn stop_live_updates(&mut self) {
        self.polling.stop();
        self.set_payload(None);
    }

    /// Display every queued live payload. Returns how many were applied.
    pub fn apply_live_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Some(update) = self.polling.try_next() {
            self.set_payload(Some(update.display_text()));
            applied += 1;
        }
        applied
    }

    /// Wait for the next live payload and display it. `None` when no
    /// subscription is active.
    pub async fn next_live_update(&mut self) -> Option<String> {
        let update = self.polling.next().await?;
        let text = update.display_text();
        self.set_payload(Some(text.clone()));
        Some(text)
    }

    // ── Plumbing ─────────────────────────────────────────────────

    fn set_payload(&mut self, payload: Option<String>) {
        let changed = self.payload.send_if_modified(|current| {
            if *current == payload {
                false
            } else {
                current.clone_from(&payload);
                true
            }
        });
        if changed {
            self.emit(OrchestratorEvent::PayloadChanged);
        }
    }

    fn notify(&self, notification: Notification) {
        self.notifications.publish(&notification);
    }

    fn emit(&self, event: OrchestratorEvent) {
        let _ = self.events.send(event);
    }
}

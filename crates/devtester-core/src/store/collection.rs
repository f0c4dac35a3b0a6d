// ── Device collection ──
//
// The authoritative ordered device list plus the selection slot. Pure
// in-memory state: persistence and the reactions to selection changes
// belong to the orchestrator. Selection is published through a `watch`
// channel so bindings can follow it without polling.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::CoreError;
use crate::model::DeviceRecord;

/// Result of merging a candidate into the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Inserted at the front under this identity.
    Created { device_id: String },
    /// Replaced the record at its existing position.
    Updated { device_id: String },
}

impl SaveOutcome {
    pub fn device_id(&self) -> &str {
        match self {
            Self::Created { device_id } | Self::Updated { device_id } => device_id,
        }
    }
}

pub struct DeviceCollection {
    devices: Vec<DeviceRecord>,
    selected: watch::Sender<Option<String>>,
    snapshot: watch::Sender<Arc<Vec<DeviceRecord>>>,
}

impl Default for DeviceCollection {
    fn default() -> Self {
        let (selected, _) = watch::channel(None);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            devices: Vec::new(),
            selected,
            snapshot,
        }
    }
}

impl DeviceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.device_id() == device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.get(device_id).is_some()
    }

    fn position(&self, device_id: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.device_id() == device_id)
    }

    /// Identity of the selected record, if any.
    pub fn selected_id(&self) -> Option<String> {
        self.selected.borrow().clone()
    }

    pub fn selected(&self) -> Option<&DeviceRecord> {
        let id = self.selected.borrow().clone()?;
        self.get(&id)
    }

    // ── Subscriptions ───────────────────────────────────────────────

    pub fn watch_selection(&self) -> watch::Receiver<Option<String>> {
        self.selected.subscribe()
    }

    /// Deep-copied snapshot of the list, rebuilt on every mutation.
    pub fn watch_devices(&self) -> watch::Receiver<Arc<Vec<DeviceRecord>>> {
        self.snapshot.subscribe()
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Change the selection. Returns `true` if it moved.
    pub fn select(&mut self, device_id: Option<&str>) -> Result<bool, CoreError> {
        if let Some(id) = device_id {
            if !self.contains(id) {
                return Err(CoreError::DeviceNotFound {
                    identifier: id.to_owned(),
                });
            }
        }
        let next = device_id.map(str::to_owned);
        let moved = self.selected.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                current.clone_from(&next);
                true
            }
        });
        if moved {
            debug!(selected = ?next, "selection changed");
        }
        Ok(moved)
    }

    /// Drop the selection. Returns `true` if something was selected.
    pub fn clear_selection(&mut self) -> bool {
        self.selected.send_replace(None).is_some()
    }

    /// Merge `candidate` into the list.
    ///
    /// Rejects a candidate whose IP and port match a record with a different
    /// identity. Otherwise fills empty identities, derives the display name
    /// from the agent, and either replaces the record with the same identity
    /// in place or inserts a copy at the front with authentication unknown.
    pub fn save(&mut self, candidate: &DeviceRecord) -> Result<SaveOutcome, CoreError> {
        let duplicate = self.devices.iter().any(|d| {
            d.device_id() != candidate.device_id()
                && d.ip_address() == candidate.ip_address()
                && d.port() == candidate.port()
        });
        if duplicate {
            return Err(CoreError::DuplicateDevice {
                ip_address: candidate.ip_address().to_owned(),
                port: candidate.port().to_owned(),
            });
        }

        let mut record = candidate.deep_copy();
        record.assign_identities();
        record.set_device_name(format!("Device {}", record.agent()));
        let device_id = record.device_id().to_owned();

        let outcome = if let Some(index) = self.position(&device_id) {
            if let Some(slot) = self.devices.get_mut(index) {
                *slot = record;
            }
            SaveOutcome::Updated { device_id }
        } else {
            record.set_is_authenticated(None);
            self.devices.insert(0, record);
            SaveOutcome::Created { device_id }
        };
        debug!(outcome = ?outcome, count = self.devices.len(), "device saved");
        self.publish();
        Ok(outcome)
    }

    /// Remove by identity. Clears the selection if it pointed at the record.
    pub fn remove(&mut self, device_id: &str) -> Option<DeviceRecord> {
        let index = self.position(device_id)?;
        let removed = self.devices.remove(index);
        if self.selected.borrow().as_deref() == Some(device_id) {
            self.selected.send_replace(None);
        }
        self.publish();
        Some(removed)
    }

    /// Replace the whole list. Selection is cleared if its record vanished.
    /// Returns `true` if the selection was cleared.
    pub fn replace_all(&mut self, devices: Vec<DeviceRecord>) -> bool {
        self.devices = devices;
        let stale = self
            .selected
            .borrow()
            .as_deref()
            .is_some_and(|id| !self.contains(id));
        if stale {
            self.selected.send_replace(None);
        }
        self.publish();
        stale
    }

    /// Set one record's authentication state. Returns `false` if not found.
    pub fn set_authenticated(&mut self, device_id: &str, value: Option<bool>) -> bool {
        let Some(device) = self.devices.iter_mut().find(|d| d.device_id() == device_id) else {
            return false;
        };
        if device.set_is_authenticated(value) {
            self.publish();
        }
        true
    }

    /// Apply `f` to every record's authentication state.
    pub fn set_all_authenticated(&mut self, mut f: impl FnMut() -> Option<bool>) {
        for device in &mut self.devices {
            device.set_is_authenticated(f());
        }
        self.publish();
    }

    fn publish(&self) {
        let copy: Vec<DeviceRecord> = self.devices.iter().map(DeviceRecord::deep_copy).collect();
        self.snapshot.send_replace(Arc::new(copy));
    }
}

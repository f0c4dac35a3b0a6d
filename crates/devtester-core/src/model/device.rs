// ── Device record ──
//
// The validated entity. Every setter follows the same contract: no-op on
// an equal value, otherwise update, revalidate that field, then emit a
// field-changed event and (for validated fields) an errors-changed event.
// Subscribers are per instance; `deep_copy` never carries them over.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::agent::Agent;
use super::validation::{DeviceField, ErrorSet, validate_field};

const RECORD_EVENT_CAPACITY: usize = 64;

/// Change notifications emitted by a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    FieldChanged(DeviceField),
    ErrorsChanged(DeviceField),
}

/// Per-instance event sender. Cloning creates a fresh, unsubscribed channel.
struct RecordEvents(broadcast::Sender<RecordEvent>);

impl Default for RecordEvents {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(RECORD_EVENT_CAPACITY);
        Self(tx)
    }
}

impl Clone for RecordEvents {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for RecordEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordEvents")
            .field("subscribers", &self.0.receiver_count())
            .finish()
    }
}

/// A network-addressable device and its connection parameters.
///
/// `device_id` is the identity key once non-empty. `is_authenticated` is
/// tri-state: `None` while unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredDevice", into = "StoredDevice")]
pub struct DeviceRecord {
    agent: String,
    device_id: String,
    solution_id: String,
    device_name: String,
    ip_address: String,
    port: String,
    username: String,
    password: String,
    use_secure_connection: bool,
    is_authenticated: Option<bool>,
    errors: ErrorSet,
    events: RecordEvents,
}

impl Default for DeviceRecord {
    /// A pristine record with factory defaults and an empty error set.
    fn default() -> Self {
        Self {
            agent: Agent::Redfish.to_string(),
            device_id: String::new(),
            solution_id: String::new(),
            device_name: String::new(),
            ip_address: "127.0.0.0".into(),
            port: "9000".into(),
            username: String::new(),
            password: String::new(),
            use_secure_connection: true,
            is_authenticated: None,
            errors: ErrorSet::default(),
            events: RecordEvents::default(),
        }
    }
}

impl DeviceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Independent copy: same field values and errors, no shared subscribers.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Subscribe to this instance's field and error change events.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.events.0.subscribe()
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn solution_id(&self) -> &str {
        &self.solution_id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn use_secure_connection(&self) -> bool {
        self.use_secure_connection
    }

    pub fn is_authenticated(&self) -> Option<bool> {
        self.is_authenticated
    }

    /// `true` until the record has been assigned an identity.
    pub fn is_new(&self) -> bool {
        self.device_id.is_empty()
    }

    /// Same non-empty identity as `other`.
    pub fn same_identity(&self, other: &Self) -> bool {
        !self.device_id.is_empty() && self.device_id == other.device_id
    }

    // ── Validation ──────────────────────────────────────────────────

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    /// Messages for a single field.
    pub fn field_errors(&self, field: DeviceField) -> &[String] {
        self.errors.get(field)
    }

    /// Every field passes its rules. Evaluated fresh on each call.
    pub fn can_save(&self) -> bool {
        DeviceField::VALIDATED
            .iter()
            .all(|f| validate_field(*f, self.text_value(*f)).is_empty())
    }

    /// Full violation list, evaluated fresh, without touching the error set.
    pub fn validation_messages(&self) -> Vec<String> {
        DeviceField::VALIDATED
            .iter()
            .flat_map(|f| validate_field(*f, self.text_value(*f)))
            .collect()
    }

    /// Recompute the error set for every validated field.
    pub fn validate_all(&mut self) {
        for field in DeviceField::VALIDATED {
            self.revalidate(field);
        }
    }

    fn text_value(&self, field: DeviceField) -> &str {
        match field {
            DeviceField::Agent => &self.agent,
            DeviceField::DeviceId => &self.device_id,
            DeviceField::SolutionId => &self.solution_id,
            DeviceField::DeviceName => &self.device_name,
            DeviceField::IpAddress => &self.ip_address,
            DeviceField::Port => &self.port,
            DeviceField::Username => &self.username,
            DeviceField::Password => &self.password,
            DeviceField::UseSecureConnection | DeviceField::IsAuthenticated => "",
        }
    }

    fn revalidate(&mut self, field: DeviceField) {
        let messages = validate_field(field, self.text_value(field));
        self.errors.set(field, messages);
    }

    fn emit(&self, event: RecordEvent) {
        // No receivers is the common case; nothing to report.
        let _ = self.events.0.send(event);
    }

    // ── Setters ─────────────────────────────────────────────────────

    fn set_text(&mut self, field: DeviceField, value: String) -> bool {
        let slot = match field {
            DeviceField::Agent => &mut self.agent,
            DeviceField::DeviceId => &mut self.device_id,
            DeviceField::SolutionId => &mut self.solution_id,
            DeviceField::DeviceName => &mut self.device_name,
            DeviceField::IpAddress => &mut self.ip_address,
            DeviceField::Port => &mut self.port,
            DeviceField::Username => &mut self.username,
            DeviceField::Password => &mut self.password,
            DeviceField::UseSecureConnection | DeviceField::IsAuthenticated => return false,
        };
        if *slot == value {
            return false;
        }
        *slot = value;

        self.emit(RecordEvent::FieldChanged(field));
        self.revalidate(field);
        self.emit(RecordEvent::ErrorsChanged(field));
        true
    }

    pub fn set_agent(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::Agent, value.into())
    }

    pub fn set_device_id(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::DeviceId, value.into())
    }

    pub fn set_solution_id(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::SolutionId, value.into())
    }

    pub fn set_device_name(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::DeviceName, value.into())
    }

    pub fn set_ip_address(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::IpAddress, value.into())
    }

    pub fn set_port(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::Port, value.into())
    }

    pub fn set_username(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::Username, value.into())
    }

    pub fn set_password(&mut self, value: impl Into<String>) -> bool {
        self.set_text(DeviceField::Password, value.into())
    }

    pub fn set_use_secure_connection(&mut self, value: bool) -> bool {
        if self.use_secure_connection == value {
            return false;
        }
        self.use_secure_connection = value;
        self.emit(RecordEvent::FieldChanged(DeviceField::UseSecureConnection));
        true
    }

    pub fn set_is_authenticated(&mut self, value: Option<bool>) -> bool {
        if self.is_authenticated == value {
            return false;
        }
        self.is_authenticated = value;
        self.emit(RecordEvent::FieldChanged(DeviceField::IsAuthenticated));
        true
    }

    /// Fill empty identities with fresh GUIDs. Returns `true` if either changed.
    pub(crate) fn assign_identities(&mut self) -> bool {
        let mut changed = false;
        if self.device_id.is_empty() {
            changed |= self.set_device_id(Uuid::new_v4().to_string());
        }
        if self.solution_id.is_empty() {
            changed |= self.set_solution_id(Uuid::new_v4().to_string());
        }
        changed
    }
}

// ── Persisted shape ─────────────────────────────────────────────────

/// Field-keyed storage layout. Unknown keys are ignored on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct StoredDevice {
    agent: String,
    device_id: String,
    solution_id: String,
    device_name: String,
    ip_address: String,
    port: String,
    username: String,
    password: String,
    use_secure_connection: bool,
    is_authenticated: Option<bool>,
}

impl Default for StoredDevice {
    fn default() -> Self {
        DeviceRecord::default().into()
    }
}

impl From<StoredDevice> for DeviceRecord {
    fn from(s: StoredDevice) -> Self {
        let mut record = Self {
            agent: s.agent,
            device_id: s.device_id,
            solution_id: s.solution_id,
            device_name: s.device_name,
            ip_address: s.ip_address,
            port: s.port,
            username: s.username,
            password: s.password,
            use_secure_connection: s.use_secure_connection,
            is_authenticated: s.is_authenticated,
            errors: ErrorSet::default(),
            events: RecordEvents::default(),
        };
        record.validate_all();
        record
    }
}

impl From<DeviceRecord> for StoredDevice {
    fn from(d: DeviceRecord) -> Self {
        Self {
            agent: d.agent,
            device_id: d.device_id,
            solution_id: d.solution_id,
            device_name: d.device_name,
            ip_address: d.ip_address,
            port: d.port,
            username: d.username,
            password: d.password,
            use_secure_connection: d.use_secure_connection,
            is_authenticated: d.is_authenticated,
        }
    }
}

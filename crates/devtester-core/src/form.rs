// ── Edit form state ──
//
// The record being edited plus the choice lists the form offers. The
// editing record is always an independent copy; nothing here aliases a
// list-resident record.

use crate::model::{Agent, DeviceField, DeviceRecord, FALLBACK_PORT, ports_for, sort_ports};

/// A single user edit to the form's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Agent(String),
    DeviceId(String),
    SolutionId(String),
    DeviceName(String),
    IpAddress(String),
    Port(String),
    Username(String),
    Password(String),
    UseSecureConnection(bool),
}

impl FieldUpdate {
    pub fn field(&self) -> DeviceField {
        match self {
            Self::Agent(_) => DeviceField::Agent,
            Self::DeviceId(_) => DeviceField::DeviceId,
            Self::SolutionId(_) => DeviceField::SolutionId,
            Self::DeviceName(_) => DeviceField::DeviceName,
            Self::IpAddress(_) => DeviceField::IpAddress,
            Self::Port(_) => DeviceField::Port,
            Self::Username(_) => DeviceField::Username,
            Self::Password(_) => DeviceField::Password,
            Self::UseSecureConnection(_) => DeviceField::UseSecureConnection,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceForm {
    record: DeviceRecord,
    available_agents: Vec<String>,
    available_ports: Vec<String>,
    error_message: Option<String>,
}

impl Default for DeviceForm {
    fn default() -> Self {
        let mut form = Self {
            record: DeviceRecord::new(),
            available_agents: Agent::available(),
            available_ports: Vec::new(),
            error_message: None,
        };
        form.load_ports();
        form
    }
}

impl DeviceForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    pub fn available_agents(&self) -> &[String] {
        &self.available_agents
    }

    pub fn available_ports(&self) -> &[String] {
        &self.available_ports
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub(crate) fn set_error_message(&mut self, message: Option<String>) -> bool {
        if self.error_message == message {
            return false;
        }
        self.error_message = message;
        true
    }

    /// Swap in a new editing record and refresh the port choices for it.
    pub(crate) fn replace_record(&mut self, record: DeviceRecord) {
        self.record = record;
        self.load_ports();
    }

    pub(crate) fn record_mut(&mut self) -> &mut DeviceRecord {
        &mut self.record
    }

    /// Apply one edit. An agent change reloads the port list.
    /// Returns `true` if the record changed.
    pub fn apply(&mut self, update: FieldUpdate) -> bool {
        let is_agent = matches!(update, FieldUpdate::Agent(_));
        let changed = match update {
            FieldUpdate::Agent(v) => self.record.set_agent(v),
            FieldUpdate::DeviceId(v) => self.record.set_device_id(v),
            FieldUpdate::SolutionId(v) => self.record.set_solution_id(v),
            FieldUpdate::DeviceName(v) => self.record.set_device_name(v),
            FieldUpdate::IpAddress(v) => self.record.set_ip_address(v),
            FieldUpdate::Port(v) => self.record.set_port(v),
            FieldUpdate::Username(v) => self.record.set_username(v),
            FieldUpdate::Password(v) => self.record.set_password(v),
            FieldUpdate::UseSecureConnection(v) => self.record.set_use_secure_connection(v),
        };
        if changed && is_agent {
            self.load_ports();
        }
        changed
    }

    /// Rebuild the port choices for the record's agent.
    ///
    /// A brand-new record takes the first allowed port. An existing record
    /// keeps its port, which is added to the choices if the table lacks it.
    pub fn load_ports(&mut self) {
        self.available_ports = ports_for(self.record.agent());

        if self.record.is_new() {
            let first = self
                .available_ports
                .first()
                .cloned()
                .unwrap_or_else(|| FALLBACK_PORT.to_owned());
            self.record.set_port(first);
        } else {
            let port = self.record.port();
            if !port.is_empty() && !self.available_ports.iter().any(|p| p == port) {
                self.available_ports.push(port.to_owned());
                sort_ports(&mut self.available_ports);
            }
        }
    }
}

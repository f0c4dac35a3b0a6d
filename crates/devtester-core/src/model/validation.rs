// ── Field validation ──
//
// A fixed rule table keyed by field. Rules run in table order and a
// failed `Required` short-circuits the rest of that field's rules.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter};

use super::agent::OTHER_PORT;

/// Every mutable field of a device record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter, Serialize,
)]
pub enum DeviceField {
    Agent,
    DeviceId,
    SolutionId,
    DeviceName,
    IpAddress,
    Port,
    Username,
    Password,
    UseSecureConnection,
    IsAuthenticated,
}

impl DeviceField {
    /// Fields that carry at least one rule.
    pub const VALIDATED: [Self; 7] = [
        Self::Agent,
        Self::DeviceId,
        Self::SolutionId,
        Self::IpAddress,
        Self::Port,
        Self::Username,
        Self::Password,
    ];

    pub fn is_validated(self) -> bool {
        !rules(self).is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Required(&'static str),
    Guid(&'static str),
    IpAddress(&'static str),
    PortRange(&'static str),
}

fn rules(field: DeviceField) -> &'static [Rule] {
    match field {
        DeviceField::Agent => &[Rule::Required("Agent is required")],
        DeviceField::DeviceId => &[Rule::Guid("DeviceId must be a valid GUID")],
        DeviceField::SolutionId => &[Rule::Guid("SolutionId must be a valid GUID")],
        DeviceField::IpAddress => &[
            Rule::Required("IP Address is required"),
            Rule::IpAddress("Invalid IP address"),
        ],
        DeviceField::Port => &[
            Rule::Required("Port is required"),
            Rule::PortRange("Port must be between 1 and 65535"),
        ],
        DeviceField::Username => &[Rule::Required("Username is required")],
        DeviceField::Password => &[Rule::Required("Password is required")],
        DeviceField::DeviceName | DeviceField::UseSecureConnection | DeviceField::IsAuthenticated => {
            &[]
        }
    }
}

/// Run every rule for `field` against `value`, returning violation messages.
pub fn validate_field(field: DeviceField, value: &str) -> Vec<String> {
    let mut violations = Vec::new();
    for rule in rules(field) {
        match *rule {
            Rule::Required(msg) => {
                if value.trim().is_empty() {
                    violations.push(msg.to_owned());
                    break;
                }
            }
            Rule::Guid(msg) => {
                if !value.is_empty() && !is_guid_shape(value) {
                    violations.push(msg.to_owned());
                }
            }
            Rule::IpAddress(msg) => {
                if !is_ipv4(value) && !is_ipv6(value) {
                    violations.push(msg.to_owned());
                }
            }
            Rule::PortRange(msg) => {
                if !is_port_value(value) {
                    violations.push(msg.to_owned());
                }
            }
        }
    }
    violations
}

/// `8-4-4-4-12` hex groups separated by hyphens.
pub fn is_guid_shape(value: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = value.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Dotted quad with each octet in 0..=255 and no leading zeros.
pub fn is_ipv4(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| is_octet(o))
}

fn is_octet(octet: &str) -> bool {
    if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if octet.len() > 1 && octet.starts_with('0') {
        return false;
    }
    octet.parse::<u16>().is_ok_and(|n| n <= 255)
}

/// Full eight-group hex form; `::` compression is not accepted.
pub fn is_ipv6(value: &str) -> bool {
    let groups: Vec<&str> = value.split(':').collect();
    groups.len() == 8
        && groups
            .iter()
            .all(|g| (1..=4).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Integer in 1..=65535, or the manual-entry sentinel.
fn is_port_value(value: &str) -> bool {
    value == OTHER_PORT || value.trim().parse::<i64>().is_ok_and(|n| (1..=65_535).contains(&n))
}

// ── ErrorSet ────────────────────────────────────────────────────────

/// Violation messages per field. A field is present only while it has
/// at least one violation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorSet {
    by_field: BTreeMap<DeviceField, Vec<String>>,
}

impl ErrorSet {
    /// Replace the messages for `field`; an empty list removes the entry.
    /// Returns `true` if the stored messages changed.
    pub fn set(&mut self, field: DeviceField, messages: Vec<String>) -> bool {
        if messages.is_empty() {
            self.by_field.remove(&field).is_some()
        } else if self.by_field.get(&field) == Some(&messages) {
            false
        } else {
            self.by_field.insert(field, messages);
            true
        }
    }

    pub fn get(&self, field: DeviceField) -> &[String] {
        self.by_field.get(&field).map_or(&[], Vec::as_slice)
    }

    pub fn has_errors(&self) -> bool {
        !self.by_field.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceField, &[String])> {
        self.by_field.iter().map(|(f, m)| (*f, m.as_slice()))
    }

    /// Every message, field order preserved.
    pub fn messages(&self) -> Vec<String> {
        self.by_field.values().flatten().cloned().collect()
    }
}

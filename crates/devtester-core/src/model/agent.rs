// ── Agent families and their port table ──

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Sentinel port value offered in every agent's port list for manual entry.
pub const OTHER_PORT: &str = "Other";

/// Port assigned to a brand-new record whose agent offers no ports.
pub const FALLBACK_PORT: &str = "0000";

/// Protocol family a device speaks.
///
/// Records store the agent as a plain string so unknown values survive a
/// load/save cycle; this enum is the set the form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
pub enum Agent {
    Redfish,
    EcoRT,
    SoftdPACManager,
}

impl Agent {
    /// Ports offered for this agent, in table order.
    pub fn allowed_ports(self) -> &'static [&'static str] {
        match self {
            Self::Redfish => &["9000", OTHER_PORT],
            Self::EcoRT => &["51443", "51499", OTHER_PORT],
            Self::SoftdPACManager => &["443", OTHER_PORT],
        }
    }

    /// Every agent in the order the form lists them.
    pub fn available() -> Vec<String> {
        Self::iter().map(|a| a.to_string()).collect()
    }
}

/// Ports allowed for an agent given by name. Unknown agents have none.
pub fn ports_for(agent: &str) -> Vec<String> {
    agent
        .parse::<Agent>()
        .map(|a| a.allowed_ports().iter().map(|p| (*p).to_owned()).collect())
        .unwrap_or_default()
}

/// Sort ports numerically ascending with `"Other"` always last.
///
/// Values that are neither numeric nor the sentinel keep their relative
/// order and sit between the numbers and `"Other"`.
pub fn sort_ports(ports: &mut [String]) {
    ports.sort_by_key(|p| port_rank(p));
}

fn port_rank(port: &str) -> (u8, u64) {
    if port == OTHER_PORT {
        (2, 0)
    } else {
        port.parse::<u64>().map_or((1, 0), |n| (0, n))
    }
}

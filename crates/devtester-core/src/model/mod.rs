// ── Domain model ──

pub mod agent;
pub mod device;
pub mod validation;

pub use agent::{Agent, FALLBACK_PORT, OTHER_PORT, ports_for, sort_ports};
pub use device::{DeviceRecord, RecordEvent};
pub use validation::{DeviceField, ErrorSet, validate_field};

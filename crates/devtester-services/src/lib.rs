//! File-backed collaborators for `devtester-core`.
//!
//! - [`JsonDeviceRepository`] persists the device list as a JSON array.
//! - [`JsonDeviceDataProvider`] serves static and dynamic payloads from
//!   JSON files and cycles through a file list for live updates.

pub mod provider;
pub mod repository;

pub use provider::{JsonDataProviderConfig, JsonDeviceDataProvider};
pub use repository::{DEFAULT_DEVICES_FILE, JsonDeviceRepository};

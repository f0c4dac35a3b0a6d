// ── Device storage ──

mod collection;

pub use collection::{DeviceCollection, SaveOutcome};

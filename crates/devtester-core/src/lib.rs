//! Orchestration core for the device tester.
//!
//! Owns the authoritative device list and everything that coordinates
//! around it, independent of any presentation layer:
//!
//! - **[`DeviceOrchestrator`]**: Guarded commands (save, clear, delete,
//!   authenticate, fetch static/dynamic, manage resources) and the
//!   initial load-then-bulk-authenticate workflow. Collaborators are
//!   passed in through [`Collaborators`].
//!
//! - **[`DeviceRecord`]**: The validated entity. Setters revalidate the
//!   changed field and emit per-instance change events; copies never
//!   share subscribers.
//!
//! - **[`BusyRegistry`]**: Named loading flags with derived aggregates
//!   and scoped [`BusyGuard`] acquisition.
//!
//! - **[`NotificationRouter`]**: Synchronous, view-filtered toast fan-out.
//!
//! - **[`PollingSession`]**: Single live subscription whose deliveries
//!   are drained on the owner's task through an `mpsc` channel.
//!
//! Persistence and payload sources are traits in [`ports`]; file-backed
//! implementations live in `devtester-services`.

pub mod busy;
pub mod config;
pub mod error;
pub mod form;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod polling;
pub mod ports;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use busy::{BusyChange, BusyGuard, BusyRegistry, LoadingState};
pub use config::OrchestratorConfig;
pub use error::{CoreError, PayloadKind};
pub use form::{DeviceForm, FieldUpdate};
pub use model::{Agent, DeviceField, DeviceRecord, ErrorSet, RecordEvent};
pub use notify::{ListenerId, Notification, NotificationLevel, NotificationRouter, ViewFilter};
pub use orchestrator::{
    AuthDecider, Collaborators, CommandKind, DeleteResult, DeviceOrchestrator, OrchestratorEvent,
    ResourceInputs, SaveResult,
};
pub use polling::{LiveUpdate, PollingSession};
pub use ports::{
    AlwaysConfirm, DeleteConfirmation, DeviceDataProvider, DeviceRepository, PayloadCallback,
    PollPayload,
};
pub use store::{DeviceCollection, SaveOutcome};

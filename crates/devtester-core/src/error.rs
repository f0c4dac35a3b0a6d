// ── Core error types ──
//
// Errors surfaced by the orchestration core. Validation and duplicate
// failures are recovered by the orchestrator and turned into form
// messages; storage and payload failures become notifications or
// displayed error strings. Collaborator implementations map their own
// failures (I/O, JSON) into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Record errors ────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("A device with the same IP and Port already exists!")]
    DuplicateDevice { ip_address: String, port: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Storage error at {path}: {message}")]
    Storage { path: String, message: String },

    #[error("{kind} data not found: {message}")]
    PayloadNotFound { kind: PayloadKind, message: String },

    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Data provider error: {message}")]
    Provider { message: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Command '{command}' is unavailable: {reason}")]
    CommandUnavailable { command: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build a `CommandUnavailable` error for a guarded command.
    pub(crate) fn unavailable(command: &str, reason: impl Into<String>) -> Self {
        Self::CommandUnavailable {
            command: command.to_owned(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a missing static/dynamic payload.
    pub fn is_payload_not_found(&self) -> bool {
        matches!(self, Self::PayloadNotFound { .. })
    }
}

/// Which data feed a payload error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PayloadKind {
    Static,
    Dynamic,
}

//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use devtester_config::ConfigError;
use devtester_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed for device '{device}'")]
    #[diagnostic(
        code(devtester::auth_failed),
        help("The check is simulated; run it again with: devtester devices authenticate {device}")
    )]
    AuthFailed { device: String },

    #[error("Device '{device}' is not authenticated")]
    #[diagnostic(
        code(devtester::not_authenticated),
        help("Run: devtester devices authenticate {device}")
    )]
    NotAuthenticated { device: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(devtester::not_found),
        help("Run: devtester {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("A device with IP {ip_address} and port {port} already exists")]
    #[diagnostic(
        code(devtester::conflict),
        help("Each device needs a unique IP address and port pair.")
    )]
    Conflict { ip_address: String, port: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(devtester::validation))]
    Validation { field: String, reason: String },

    #[error("Device is not valid:\n{}", messages.join("\n"))]
    #[diagnostic(
        code(devtester::invalid_device),
        help("Fix the listed fields and try again.")
    )]
    InvalidDevice { messages: Vec<String> },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("{command} is unavailable: {reason}")]
    #[diagnostic(code(devtester::unavailable))]
    Unavailable { command: String, reason: String },

    #[error("{message}")]
    #[diagnostic(code(devtester::data))]
    Data { message: String },

    #[error("Storage error at {path}: {message}")]
    #[diagnostic(
        code(devtester::storage),
        help("Check storage.devices_file in your configuration.")
    )]
    Storage { path: String, message: String },

    #[error("The device list could not be loaded")]
    #[diagnostic(
        code(devtester::load_failed),
        help("Check storage.devices_file in your configuration: devtester config show")
    )]
    LoadFailed,

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(devtester::config),
        help("Inspect the effective settings with: devtester config show")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(devtester::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(devtester::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(devtester::serialize))]
    Serialization(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(devtester::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::NotAuthenticated { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::InvalidDevice { .. }
            | Self::Config(ConfigError::Validation { .. })
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationFailed { message } => CliError::InvalidDevice {
                messages: vec![message],
            },

            CoreError::DuplicateDevice { ip_address, port } => {
                CliError::Conflict { ip_address, port }
            }

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices list".into(),
            },

            CoreError::Storage { path, message } => CliError::Storage { path, message },

            err @ (CoreError::PayloadNotFound { .. }
            | CoreError::MalformedPayload { .. }
            | CoreError::Provider { .. }) => CliError::Data {
                message: err.to_string(),
            },

            CoreError::CommandUnavailable { command, reason } => {
                CliError::Unavailable { command, reason }
            }

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

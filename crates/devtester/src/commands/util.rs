//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};
use std::time::Duration;

use devtester_core::{DeleteConfirmation, DeviceOrchestrator, DeviceRecord};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Delete gate backed by an interactive prompt, auto-approving with `--yes`.
pub struct PromptConfirmation {
    assume_yes: bool,
}

impl PromptConfirmation {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl DeleteConfirmation for PromptConfirmation {
    fn confirm_delete(&self, device: &DeviceRecord) -> bool {
        let prompt = format!(
            "Delete device {} ({}:{})?",
            device.device_name(),
            device.ip_address(),
            device.port()
        );
        confirm(&prompt, self.assume_yes).unwrap_or_else(|e| {
            warn!(error = %e, "confirmation prompt failed");
            false
        })
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// Refuse a destructive action that would block on a prompt nobody can answer.
pub fn require_interactive(action: &str, global: &GlobalOpts) -> Result<(), CliError> {
    if global.yes || io::stdin().is_terminal() {
        return Ok(());
    }
    Err(CliError::NonInteractiveRequiresYes {
        action: action.into(),
    })
}

/// Read a password without echo.
pub fn prompt_password() -> Result<String, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "required; pass --password or set DEVTESTER_PASSWORD".into(),
        });
    }
    rpassword::prompt_password("Password: ").map_err(CliError::Io)
}

/// Stderr spinner for a slow step; hidden when quiet or not a terminal.
pub fn spinner(message: &str, global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Load the persisted list without touching authentication state.
pub async fn load_devices(orchestrator: &mut DeviceOrchestrator) -> Result<(), CliError> {
    if orchestrator.load_all(false).await {
        Ok(())
    } else {
        Err(CliError::LoadFailed)
    }
}

/// Select `device_id` in the orchestrator, reporting an unknown id as not found.
pub fn select_device(orchestrator: &mut DeviceOrchestrator, device_id: &str) -> Result<(), CliError> {
    orchestrator.select(Some(device_id))?;
    Ok(())
}

/// The selected device must have passed authentication before data commands.
pub fn require_authenticated(orchestrator: &DeviceOrchestrator, device_id: &str) -> Result<(), CliError> {
    match orchestrator.device(device_id).map(DeviceRecord::is_authenticated) {
        Some(Some(true)) => Ok(()),
        Some(_) => Err(CliError::NotAuthenticated {
            device: device_id.into(),
        }),
        None => Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: device_id.into(),
            list_command: "devices list".into(),
        }),
    }
}

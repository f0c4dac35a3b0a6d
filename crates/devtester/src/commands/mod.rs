//! Command dispatch: bridges CLI args -> orchestrator commands -> output formatting.

pub mod config_cmd;
pub mod data;
pub mod devices;
pub mod util;

use devtester_core::DeviceOrchestrator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an inventory-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    orchestrator: &mut DeviceOrchestrator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(orchestrator, args, global).await,
        Command::Data(args) => data::handle(orchestrator, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not use the device inventory".into(),
        )),
    }
}

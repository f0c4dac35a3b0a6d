//! Data command handlers: static payloads, live dynamic updates and
//! resource descriptors.

use serde::Serialize;

use devtester_core::{DeviceOrchestrator, ResourceInputs};

use crate::cli::{DataArgs, DataCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct ResourcesView<'a> {
    device_id: &'a str,
    static_resource: &'a str,
    dynamic_resource: &'a str,
}

/// Select an authenticated device so the data guards pass.
async fn prepare(
    orchestrator: &mut DeviceOrchestrator,
    device_id: &str,
) -> Result<(), CliError> {
    util::load_devices(orchestrator).await?;
    util::select_device(orchestrator, device_id)?;
    util::require_authenticated(orchestrator, device_id)
}

fn print_payload(orchestrator: &DeviceOrchestrator, global: &GlobalOpts) {
    if let Some(payload) = orchestrator.payload() {
        output::print_output(&payload, global.quiet);
    }
}

pub async fn handle(
    orchestrator: &mut DeviceOrchestrator,
    args: DataArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DataCommand::Static { device } => {
            prepare(orchestrator, &device).await?;

            let pb = util::spinner("Fetching static data...", global);
            let result = orchestrator.fetch_static().await;
            pb.finish_and_clear();
            result?;

            print_payload(orchestrator, global);
            Ok(())
        }

        DataCommand::Watch { device, count } => {
            prepare(orchestrator, &device).await?;

            let pb = util::spinner("Fetching dynamic data...", global);
            let result = orchestrator.fetch_dynamic().await;
            pb.finish_and_clear();
            result?;

            print_payload(orchestrator, global);
            if !orchestrator.is_polling() {
                return Ok(());
            }

            let mut received = 0usize;
            while count.is_none_or(|limit| received < limit) {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::debug!("interrupted, stopping live updates");
                        break;
                    }
                    update = orchestrator.next_live_update() => {
                        let Some(text) = update else { break };
                        output::print_output(&text, global.quiet);
                        received += 1;
                    }
                }
            }
            orchestrator.stop_live_updates();
            Ok(())
        }

        DataCommand::Resources {
            device,
            static_text,
            dynamic_text,
        } => {
            prepare(orchestrator, &device).await?;
            orchestrator.manage_resources(ResourceInputs {
                static_resource: static_text,
                dynamic_resource: dynamic_text,
            })?;

            let resources = orchestrator.resources();
            let view = ResourcesView {
                device_id: &device,
                static_resource: &resources.static_resource,
                dynamic_resource: &resources.dynamic_resource,
            };
            let out = output::render_single(
                global.format(),
                &view,
                |v| {
                    format!(
                        "Device:  {}\nStatic:  {}\nDynamic: {}",
                        v.device_id, v.static_resource, v.dynamic_resource
                    )
                },
                |v| v.device_id.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

//! Device command handlers.

use serde::Serialize;
use tabled::Tabled;

use devtester_core::model::{Agent, ports_for};
use devtester_core::{DeleteResult, DeviceOrchestrator, DeviceRecord, FieldUpdate, SaveResult};

use crate::cli::{DeviceFields, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Views ───────────────────────────────────────────────────────────

/// Serializable device shape for output. Never carries the password.
#[derive(Debug, Serialize)]
pub struct DeviceView {
    pub device_id: String,
    pub solution_id: String,
    pub device_name: String,
    pub agent: String,
    pub ip_address: String,
    pub port: String,
    pub username: String,
    pub use_secure_connection: bool,
    pub is_authenticated: Option<bool>,
}

impl From<&DeviceRecord> for DeviceView {
    fn from(d: &DeviceRecord) -> Self {
        Self {
            device_id: d.device_id().to_owned(),
            solution_id: d.solution_id().to_owned(),
            device_name: d.device_name().to_owned(),
            agent: d.agent().to_owned(),
            ip_address: d.ip_address().to_owned(),
            port: d.port().to_owned(),
            username: d.username().to_owned(),
            use_secure_connection: d.use_secure_connection(),
            is_authenticated: d.is_authenticated(),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Secure")]
    secure: String,
    #[tabled(rename = "Auth")]
    auth: String,
}

impl From<&DeviceView> for DeviceRow {
    fn from(d: &DeviceView) -> Self {
        Self {
            id: d.device_id.clone(),
            name: d.device_name.clone(),
            agent: d.agent.clone(),
            ip: d.ip_address.clone(),
            port: d.port.clone(),
            secure: yes_no(d.use_secure_connection).into(),
            auth: auth_label(d.is_authenticated).into(),
        }
    }
}

#[derive(Serialize)]
struct PortView {
    port: String,
}

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Port")]
    port: String,
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn auth_label(state: Option<bool>) -> &'static str {
    match state {
        Some(true) => "authenticated",
        Some(false) => "failed",
        None => "unknown",
    }
}

fn detail(d: &DeviceView) -> String {
    [
        format!("ID:          {}", d.device_id),
        format!("Solution ID: {}", d.solution_id),
        format!("Name:        {}", d.device_name),
        format!("Agent:       {}", d.agent),
        format!("IP:          {}", d.ip_address),
        format!("Port:        {}", d.port),
        format!("Username:    {}", d.username),
        format!("Secure:      {}", yes_no(d.use_secure_connection)),
        format!("Auth:        {}", auth_label(d.is_authenticated)),
    ]
    .join("\n")
}

fn render_devices(orchestrator: &DeviceOrchestrator, global: &GlobalOpts) -> Result<(), CliError> {
    let views: Vec<DeviceView> = orchestrator.devices().iter().map(DeviceView::from).collect();
    let out = output::render_list(
        global.format(),
        &views,
        |d| DeviceRow::from(d),
        |d| d.device_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn render_device(view: &DeviceView, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.format(), view, detail, |d| d.device_id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn not_found(identifier: String) -> CliError {
    CliError::NotFound {
        resource_type: "device".into(),
        identifier,
        list_command: "devices list".into(),
    }
}

// ── Form editing ────────────────────────────────────────────────────

/// Push the given fields through the orchestrator's form. The agent goes
/// first since changing it reloads the port list.
fn apply_fields(orchestrator: &mut DeviceOrchestrator, fields: DeviceFields) {
    let secure = fields.secure_connection();
    let updates = [
        fields.agent.map(FieldUpdate::Agent),
        fields.device_id.map(FieldUpdate::DeviceId),
        fields.solution_id.map(FieldUpdate::SolutionId),
        fields.name.map(FieldUpdate::DeviceName),
        fields.ip.map(FieldUpdate::IpAddress),
        fields.port.map(FieldUpdate::Port),
        fields.username.map(FieldUpdate::Username),
        fields.password.map(FieldUpdate::Password),
        secure.map(FieldUpdate::UseSecureConnection),
    ];
    for update in updates.into_iter().flatten() {
        orchestrator.update_form(update);
    }
}

async fn commit(orchestrator: &mut DeviceOrchestrator, global: &GlobalOpts) -> Result<(), CliError> {
    let candidate = orchestrator.form().record().deep_copy();
    match orchestrator.save().await {
        SaveResult::Saved(outcome) => match orchestrator.device(outcome.device_id()) {
            Some(saved) => render_device(&DeviceView::from(saved), global),
            None => Err(CliError::Internal(format!(
                "saved device {} is missing from the list",
                outcome.device_id()
            ))),
        },
        SaveResult::Duplicate => Err(CliError::Conflict {
            ip_address: candidate.ip_address().to_owned(),
            port: candidate.port().to_owned(),
        }),
        SaveResult::Invalid(messages) => Err(CliError::InvalidDevice { messages }),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    orchestrator: &mut DeviceOrchestrator,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            util::load_devices(orchestrator).await?;
            render_devices(orchestrator, global)
        }

        DevicesCommand::Get { device } => {
            util::load_devices(orchestrator).await?;
            let view = orchestrator
                .device(&device)
                .map(DeviceView::from)
                .ok_or_else(|| not_found(device))?;
            render_device(&view, global)
        }

        DevicesCommand::Add(mut fields) => {
            util::load_devices(orchestrator).await?;
            if fields.password.is_none() {
                fields.password = Some(util::prompt_password()?);
            }
            orchestrator.clear();
            apply_fields(orchestrator, fields);
            commit(orchestrator, global).await
        }

        DevicesCommand::Update { device, fields } => {
            util::load_devices(orchestrator).await?;
            util::select_device(orchestrator, &device)?;
            apply_fields(orchestrator, fields);
            commit(orchestrator, global).await
        }

        DevicesCommand::Remove { device } => {
            util::load_devices(orchestrator).await?;
            if orchestrator.device(&device).is_none() {
                return Err(not_found(device));
            }
            util::require_interactive("devices remove", global)?;
            match orchestrator.delete(&device).await? {
                DeleteResult::Deleted => {}
                DeleteResult::Cancelled => {
                    if !global.quiet {
                        eprintln!("Cancelled");
                    }
                }
            }
            Ok(())
        }

        DevicesCommand::Authenticate { all: true, .. } => {
            let pb = util::spinner("Authenticating all devices...", global);
            let loaded = orchestrator.initialize().await;
            pb.finish_and_clear();
            if !loaded {
                return Err(CliError::LoadFailed);
            }
            render_devices(orchestrator, global)
        }

        DevicesCommand::Authenticate { device, .. } => {
            let Some(device) = device else {
                return Err(CliError::Validation {
                    field: "device".into(),
                    reason: "a device ID or --all is required".into(),
                });
            };
            util::load_devices(orchestrator).await?;
            if orchestrator.device(&device).is_none() {
                return Err(not_found(device));
            }

            let pb = util::spinner(&format!("Authenticating {device}..."), global);
            let outcome = orchestrator.authenticate(&device).await;
            pb.finish_and_clear();

            if outcome? {
                Ok(())
            } else {
                Err(CliError::AuthFailed { device })
            }
        }

        DevicesCommand::Ports { agent } => {
            let ports = ports_for(&agent);
            if ports.is_empty() {
                return Err(CliError::Validation {
                    field: "agent".into(),
                    reason: format!(
                        "unknown agent '{agent}'; expected one of: {}",
                        Agent::available().join(", ")
                    ),
                });
            }
            let views: Vec<PortView> = ports.into_iter().map(|port| PortView { port }).collect();
            let out = output::render_list(
                global.format(),
                &views,
                |p| PortRow {
                    port: p.port.clone(),
                },
                |p| p.port.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use devtester_config::Config;
use devtester_core::{
    Collaborators, DeviceOrchestrator, Notification, NotificationLevel, NotificationRouter,
    ViewFilter,
};
use devtester_services::{JsonDeviceDataProvider, JsonDeviceRepository};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::commands::util::PromptConfirmation;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        mut global,
        command,
    } = cli;
    let config_file = global
        .config
        .clone()
        .unwrap_or_else(devtester_config::config_path);

    match command {
        Command::Config(args) => commands::config_cmd::handle(args, &global, &config_file),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "devtester", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = devtester_config::load_config_from(&config_file)?;
            global.apply_defaults(&cfg.defaults.output, &cfg.defaults.color);
            let mut orchestrator = build_orchestrator(&cfg, &global)?;

            tracing::debug!(config = %config_file.display(), "dispatching command");
            let result = commands::dispatch(cmd, &mut orchestrator, &global).await;
            orchestrator.shutdown();
            result
        }
    }
}

/// Wire the file-backed collaborators and the stderr notification printer.
fn build_orchestrator(cfg: &Config, global: &GlobalOpts) -> Result<DeviceOrchestrator, CliError> {
    let provider = JsonDeviceDataProvider::new(cfg.provider_config()?)?;

    let notifications = Arc::new(NotificationRouter::new());
    let color = output::should_color(global.color_mode());
    let quiet = global.quiet;
    notifications.subscribe(ViewFilter::Any, move |n: &Notification| {
        if quiet && n.level != NotificationLevel::Error {
            return;
        }
        eprintln!("{}", output::format_notification(n, color));
    });

    let collaborators = Collaborators {
        repository: Arc::new(JsonDeviceRepository::new(cfg.storage.devices_file.clone())),
        data_provider: Arc::new(provider),
        notifications,
        confirmation: Arc::new(PromptConfirmation::new(global.yes)),
    };
    Ok(DeviceOrchestrator::new(cfg.orchestrator_config(), collaborators))
}

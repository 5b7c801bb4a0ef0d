mod cli;
mod config;
mod image;
mod logging;
mod orchestrator;
mod paths;
mod prepare;
mod provider;
mod runner;
mod service;
mod templates;
mod ui;
mod unit;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

use cli::Cli;
use orchestrator::{Intent, Orchestrator, Outcome};
use paths::PlatformPaths;
use provider::{ConfigProvider, EnvProvider, PromptProvider};
use runner::SystemExec;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = PlatformPaths::discover(cli.project_dir.clone())?;
    let _log_guard = logging::init(&paths.log_dir, cli.verbose);

    ui::banner("Jupyter Lab Deployment");

    let intent = Intent::from_flags(cli.stop, cli.status, cli.rebuild);
    let outcome = if cli.non_interactive {
        drive(&paths, EnvProvider::from_env(&paths), intent, cli.reconfigure).await?
    } else {
        drive(&paths, PromptProvider::new(&paths), intent, cli.reconfigure).await?
    };

    tracing::info!(?outcome, "run finished");
    Ok(())
}

async fn drive<P: ConfigProvider>(
    paths: &PlatformPaths,
    provider: P,
    intent: Intent,
    reconfigure: bool,
) -> Result<Outcome> {
    let orchestrator = Orchestrator::new(paths.clone(), SystemExec, provider);
    let outcome = orchestrator.run(intent, reconfigure).await.map_err(|e| {
        tracing::error!(error = %e, "run aborted");
        e
    })?;
    Ok(outcome)
}

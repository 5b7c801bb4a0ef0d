use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, ConfigError, ConfigStore};
use crate::image::ImageBuilder;
use crate::paths::{PlatformPaths, SERVICE_NAME};
use crate::prepare;
use crate::provider::{ConfigProvider, ProviderError};
use crate::runner::{Exec, ProcessRunner};
use crate::service::{ServiceController, ServiceStatus};
use crate::templates::mask_secret;
use crate::ui::{self, Tone};
use crate::unit::UnitInstaller;

pub const SETTLE_DELAY: Duration = Duration::from_secs(2);
const STATUS_LOG_LINES: usize = 10;

/// What the operator asked for on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Deploy,
    Rebuild,
    Status,
    Stop,
}

impl Intent {
    /// `--stop` wins over `--status`, which wins over `--rebuild`.
    pub fn from_flags(stop: bool, status: bool, rebuild: bool) -> Self {
        match (stop, status, rebuild) {
            (true, _, _) => Intent::Stop,
            (false, true, _) => Intent::Status,
            (false, false, true) => Intent::Rebuild,
            (false, false, false) => Intent::Deploy,
        }
    }
}

/// Where the host currently stands. Derived on every run, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    NoConfig,
    ConfigIncomplete,
    /// Config is complete but the service manager could not be asked.
    Configured,
    NotDeployed,
    Running,
    Stopped,
}

impl DeployState {
    pub fn observe(
        config_file_exists: bool,
        config: &Config,
        unit_installed: bool,
        status: &ServiceStatus,
    ) -> Self {
        if !config_file_exists {
            return DeployState::NoConfig;
        }
        if !config.is_complete().0 {
            return DeployState::ConfigIncomplete;
        }
        if status.active {
            return DeployState::Running;
        }
        if status.raw == "unknown" {
            return DeployState::Configured;
        }
        if unit_installed {
            DeployState::Stopped
        } else {
            DeployState::NotDeployed
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeployState::NoConfig => "No configuration",
            DeployState::ConfigIncomplete => "Configuration incomplete",
            DeployState::Configured => "Configured",
            DeployState::NotDeployed => "Not deployed",
            DeployState::Running => "Running",
            DeployState::Stopped => "Stopped",
        }
    }
}

/// How a run ended. Every variant maps to exit code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stopped,
    StopFailed,
    StatusShown,
    AlreadyRunning,
    Deployed,
    StartFailed,
}

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Drives one invocation from CLI intent to a finished state.
pub struct Orchestrator<E, P> {
    paths: PlatformPaths,
    store: ConfigStore,
    runner: ProcessRunner<E>,
    provider: P,
    settle: Duration,
}

impl<E: Exec, P: ConfigProvider> Orchestrator<E, P> {
    pub fn new(paths: PlatformPaths, exec: E, provider: P) -> Self {
        Self {
            store: ConfigStore::new(&paths.config_file),
            paths,
            runner: ProcessRunner::new(exec),
            provider,
            settle: SETTLE_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    #[cfg(test)]
    pub fn runner(&self) -> &ProcessRunner<E> {
        &self.runner
    }

    fn service(&self) -> ServiceController<'_, E> {
        ServiceController::new(&self.runner)
    }

    pub async fn run(&self, intent: Intent, reconfigure: bool) -> Result<Outcome, RunError> {
        tracing::info!(?intent, reconfigure, "run started");

        // Stop never looks at configuration.
        if intent == Intent::Stop {
            let stopped = self.service().stop().await;
            return Ok(if stopped { Outcome::Stopped } else { Outcome::StopFailed });
        }

        let config = self.ensure_config(reconfigure)?;

        if intent == Intent::Status {
            self.show_status(&config).await;
            return Ok(Outcome::StatusShown);
        }

        let status = self.service().status().await;
        if status.active && intent != Intent::Rebuild {
            tracing::info!("service already active, nothing to do");
            self.show_status(&config).await;
            return Ok(Outcome::AlreadyRunning);
        }

        Ok(self.deploy(&config, intent == Intent::Rebuild, status.active).await)
    }

    /// Load the configuration, asking the provider when it is incomplete or
    /// when `reconfigure` is set.
    fn ensure_config(&self, reconfigure: bool) -> Result<Config, RunError> {
        let config = self.store.load();
        let (complete, _) = config.is_complete();
        if complete && !reconfigure {
            return Ok(config);
        }

        if !complete {
            ui::warning(&format!("Missing configuration: {}", config.missing_labels().join(", ")));
        }
        let config = self.provider.provide(&config)?;
        self.store.save(&config)?;
        ui::success("Configuration saved");
        Ok(config)
    }

    async fn deploy(&self, config: &Config, force_build: bool, was_active: bool) -> Outcome {
        tracing::info!(force_build, was_active, "full deployment");

        let image = ImageBuilder::new(
            &self.runner,
            &config.container.image_name,
            &self.paths.project_dir,
        );
        if !image.ensure_image(force_build).await {
            ui::warning("Continuing despite build issues...");
        }

        ui::heading("Creating directories...");
        let dirs = prepare::ensure_directories(&[
            self.paths.config_dir.clone(),
            self.paths.cache_dir.clone(),
            config.paths.notebooks_dir.clone().into(),
        ]);
        let templates: Vec<_> = self
            .paths
            .template_files()
            .into_iter()
            .chain(self.paths.template_dirs())
            .collect();
        let placed = prepare::ensure_templates(&templates);
        tracing::info!(
            dirs_ready = dirs.created,
            templates_copied = placed.copied,
            templates_kept = placed.skipped,
            failures = dirs.failed + placed.failed,
            "filesystem prepared"
        );

        if let Err(e) = UnitInstaller::new(&self.runner, &self.paths).install(config).await {
            tracing::warn!(error = %e, "unit file not written");
            ui::warning(&e.to_string());
        }

        if was_active {
            ui::heading("Restarting service...");
            self.service().stop().await;
        }

        if !self.service().start().await {
            ui::failure("Failed to start service. Check logs:");
            ui::hint(&format!("journalctl --user -u {} -n 50", SERVICE_NAME), "");
            return Outcome::StartFailed;
        }

        tokio::time::sleep(self.settle).await;
        self.show_status(config).await;
        Outcome::Deployed
    }

    async fn show_status(&self, config: &Config) {
        let status = self.service().status().await;
        let state = DeployState::observe(
            self.store.path().exists(),
            config,
            self.paths.unit_file.exists(),
            &status,
        );
        tracing::info!(state = state.label(), raw = %status.raw, "status");

        if !status.active {
            ui::panel(
                Some("Jupyter Lab Status"),
                &[format!(
                    "\u{26a0} Service is not running (status: {}, {})",
                    status.raw,
                    state.label().to_lowercase()
                )],
                Tone::Warn,
            );
            return;
        }

        ui::panel(
            Some("Jupyter Lab Status"),
            &[
                "\u{2713} Jupyter Lab is running".to_string(),
                String::new(),
                format!("Access at: http://localhost:{}", config.container.port),
                format!("Notebooks: {}", config.paths.notebooks_dir),
                format!("Model:     {}", config.ai.model),
                format!("API key:   {}", mask_secret(&config.ai.api_key)),
                format!("Service:   {}", SERVICE_NAME),
            ],
            Tone::Good,
        );

        ui::heading("Recent logs:");
        self.service().tail_logs(STATUS_LOG_LINES).await;

        ui::heading("Commands:");
        ui::hint("systemctl --user restart jupyter-lab", "Restart");
        ui::hint("journalctl --user -u jupyter-lab -f", "View logs");
        ui::hint("jupyter-deploy --stop", "Stop service");
    }
}

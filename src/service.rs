use crate::paths::SERVICE_NAME;
use crate::runner::{Exec, FailurePolicy, ProcessRunner};
use crate::ui;

const SYSTEMCTL: &str = "systemctl";
const JOURNALCTL: &str = "journalctl";

/// Live state of the managed unit, as reported by the service manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub active: bool,
    pub raw: String,
}

impl ServiceStatus {
    pub fn unknown() -> Self {
        Self {
            active: false,
            raw: "unknown".into(),
        }
    }
}

/// Start, stop and inspect the Jupyter Lab user unit.
pub struct ServiceController<'a, E> {
    runner: &'a ProcessRunner<E>,
}

impl<'a, E: Exec> ServiceController<'a, E> {
    pub fn new(runner: &'a ProcessRunner<E>) -> Self {
        Self { runner }
    }

    /// Query the unit state. Never fails; an unreachable manager reads as
    /// inactive with status "unknown".
    pub async fn status(&self) -> ServiceStatus {
        match self
            .runner
            .query(&[SYSTEMCTL, "--user", "is-active", SERVICE_NAME])
            .await
        {
            Some(out) => {
                let raw = out.stdout.trim();
                ServiceStatus {
                    active: out.success,
                    raw: if raw.is_empty() { "unknown".into() } else { raw.to_string() },
                }
            }
            None => ServiceStatus::unknown(),
        }
    }

    /// Ask the manager to re-read unit files. Tolerated on failure.
    pub async fn reload(&self) -> bool {
        let reloaded = self
            .runner
            .run(
                &[SYSTEMCTL, "--user", "daemon-reload"],
                "Failed to reload systemd",
                FailurePolicy::Tolerate,
            )
            .await
            .unwrap_or(false);
        if reloaded {
            ui::success("Systemd configuration reloaded");
        }
        reloaded
    }

    /// Start the unit and enable it for future logins.
    pub async fn start(&self) -> bool {
        ui::heading("Starting service...");
        let spinner = ui::spinner("Starting...");
        let started = self
            .runner
            .run_with_spinner(
                &[SYSTEMCTL, "--user", "start", SERVICE_NAME],
                "Failed to start service",
                FailurePolicy::Fatal,
                &spinner,
            )
            .await;

        if let Err(e) = started {
            tracing::error!(error = %e, detail = %e.diagnostic, "service start failed");
            return false;
        }

        // Not enabling only affects the next login.
        let _ = self
            .runner
            .run(
                &[SYSTEMCTL, "--user", "enable", SERVICE_NAME],
                "Failed to enable service",
                FailurePolicy::Tolerate,
            )
            .await;
        tracing::info!(unit = SERVICE_NAME, "service started");
        ui::success("Service started");
        true
    }

    /// Stop the unit. The grace period before a forced kill lives in the
    /// unit's `ExecStop`.
    pub async fn stop(&self) -> bool {
        ui::heading("Stopping service...");
        match self
            .runner
            .run(
                &[SYSTEMCTL, "--user", "stop", SERVICE_NAME],
                "Failed to stop service",
                FailurePolicy::Fatal,
            )
            .await
        {
            Ok(_) => {
                tracing::info!(unit = SERVICE_NAME, "service stopped");
                ui::success("Service stopped");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, detail = %e.diagnostic, "service stop failed");
                false
            }
        }
    }

    /// Print the last `lines` journal entries for the unit. Best effort.
    pub async fn tail_logs(&self, lines: usize) {
        let n = lines.to_string();
        self.runner
            .passthrough(
                &[JOURNALCTL, "--user", "-u", SERVICE_NAME, "-n", n.as_str(), "--no-pager"],
                "Failed to read service logs",
            )
            .await;
    }
}

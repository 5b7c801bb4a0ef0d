use indicatif::ProgressBar;
use std::io;
use thiserror::Error;
use tokio::process::Command;

use crate::ui;

/// A step that failed where continuing makes no sense. Returned as a value;
/// the caller decides whether the whole run is affected.
#[derive(Debug, Clone, Error)]
#[error("{description}")]
pub struct DeploymentError {
    pub description: String,
    pub diagnostic: String,
}

/// What to do when a command exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log a warning and report `false`.
    Tolerate,
    /// Log an error and return a `DeploymentError`.
    Fatal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Capability to execute an external program and capture its output.
#[allow(async_fn_in_trait)]
pub trait Exec {
    async fn exec(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
}

/// Runs programs on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExec;

impl Exec for SystemExec {
    async fn exec(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output().await?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Failures caused by the local setup rather than the command itself.
/// These get an extra hint since re-running will not help.
fn spawn_hint(program: &str, err: &io::Error) -> Option<String> {
    match err.kind() {
        io::ErrorKind::NotFound => Some(format!("{program} is not installed or not on PATH")),
        io::ErrorKind::PermissionDenied => Some(format!("permission denied running {program}")),
        _ => None,
    }
}

fn stderr_hint(program: &str, stderr: &str) -> Option<String> {
    let lower = stderr.to_lowercase();
    if lower.contains("failed to connect to bus") {
        Some("no user service manager reachable: is a systemd user session running?".into())
    } else if lower.contains("permission denied") {
        Some(format!("permission denied: check that the current user may run {program}"))
    } else {
        None
    }
}

/// The single path every external command takes, so that logging and
/// failure classification stay uniform.
pub struct ProcessRunner<E> {
    exec: E,
}

impl<E: Exec> ProcessRunner<E> {
    pub fn new(exec: E) -> Self {
        Self { exec }
    }

    #[cfg(test)]
    pub fn exec(&self) -> &E {
        &self.exec
    }

    /// Run a command whose failure matters. `Ok(true)` on success,
    /// `Ok(false)` on a tolerated failure.
    pub async fn run(
        &self,
        cmd: &[&str],
        description: &str,
        policy: FailurePolicy,
    ) -> Result<bool, DeploymentError> {
        let result = self.spawn(cmd).await;
        self.report(cmd, result, description, policy)
    }

    /// Like [`run`](Self::run), but `spinner` is cleared once the command
    /// exits and before any failure is printed.
    pub async fn run_with_spinner(
        &self,
        cmd: &[&str],
        description: &str,
        policy: FailurePolicy,
        spinner: &ProgressBar,
    ) -> Result<bool, DeploymentError> {
        let result = self.spawn(cmd).await;
        spinner.finish_and_clear();
        self.report(cmd, result, description, policy)
    }

    fn report(
        &self,
        cmd: &[&str],
        result: io::Result<CommandOutput>,
        description: &str,
        policy: FailurePolicy,
    ) -> Result<bool, DeploymentError> {
        let program = cmd.first().copied().unwrap_or_default();
        let (diagnostic, hint) = match result {
            Ok(out) if out.success => return Ok(true),
            Ok(out) => {
                let stderr = out.stderr.trim().to_string();
                let hint = stderr_hint(program, &stderr);
                (stderr, hint)
            }
            Err(e) => (e.to_string(), spawn_hint(program, &e)),
        };
        let diagnostic = match hint {
            Some(hint) => format!("{}\n{}", diagnostic, hint),
            None => diagnostic,
        };

        match policy {
            FailurePolicy::Tolerate => {
                tracing::warn!(command = %cmd.join(" "), error = %diagnostic, "{}", description);
                ui::warning(description);
                ui::detail(&diagnostic);
                Ok(false)
            }
            FailurePolicy::Fatal => {
                tracing::error!(command = %cmd.join(" "), error = %diagnostic, "{}", description);
                ui::failure(description);
                ui::detail(&diagnostic);
                Err(DeploymentError {
                    description: description.to_string(),
                    diagnostic,
                })
            }
        }
    }

    /// Read-only probe. Returns `None` when the program cannot be started;
    /// a non-zero exit is returned as-is for the caller to interpret.
    pub async fn query(&self, cmd: &[&str]) -> Option<CommandOutput> {
        match self.spawn(cmd).await {
            Ok(out) => Some(out),
            Err(e) => {
                tracing::debug!(command = %cmd.join(" "), error = %e, "probe failed to start");
                None
            }
        }
    }

    /// Run a display-only command and echo its output. Never fails.
    pub async fn passthrough(&self, cmd: &[&str], description: &str) {
        match self.spawn(cmd).await {
            Ok(out) if out.success => print!("{}", out.stdout),
            Ok(out) => {
                tracing::warn!(command = %cmd.join(" "), error = %out.stderr.trim(), "{}", description);
                ui::detail(out.stderr.trim());
            }
            Err(e) => {
                tracing::warn!(command = %cmd.join(" "), error = %e, "{}", description);
            }
        }
    }

    async fn spawn(&self, cmd: &[&str]) -> io::Result<CommandOutput> {
        let (program, args) = cmd
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
        tracing::debug!(command = %cmd.join(" "), "exec");
        let out = self.exec.exec(program, args).await?;
        tracing::debug!(command = %program, code = ?out.code, "exit");
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Scripted `Exec` that records every command line it sees. Commands
    /// without a scripted response succeed with empty output.
    #[derive(Default)]
    pub struct FakeExec {
        responses: RefCell<HashMap<String, io::Result<CommandOutput>>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeExec {
        pub fn respond(&self, cmd: &str, out: CommandOutput) {
            self.responses.borrow_mut().insert(cmd.to_string(), Ok(out));
        }

        pub fn fail(&self, cmd: &str, stderr: &str) {
            self.respond(
                cmd,
                CommandOutput {
                    success: false,
                    code: Some(1),
                    stderr: stderr.to_string(),
                    ..Default::default()
                },
            );
        }

        pub fn unavailable(&self, cmd: &str) {
            self.responses.borrow_mut().insert(
                cmd.to_string(),
                Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory")),
            );
        }

        pub fn calls_starting_with(&self, prefix: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    pub fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    impl Exec for FakeExec {
        async fn exec(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
            let line = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.borrow_mut().push(line.clone());
            match self.responses.borrow().get(&line) {
                Some(Ok(out)) => Ok(out.clone()),
                Some(Err(e)) => Err(io::Error::new(e.kind(), e.to_string())),
                None => Ok(ok("")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeExec;
    use super::*;

    #[tokio::test]
    async fn run_success_is_true() {
        let runner = ProcessRunner::new(FakeExec::default());
        let ok = runner.run(&["true"], "noop", FailurePolicy::Fatal).await.unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn tolerated_failure_is_false() {
        let fake = FakeExec::default();
        fake.fail("podman build", "boom");
        let runner = ProcessRunner::new(fake);
        let ok = runner
            .run(&["podman", "build"], "Failed to build image", FailurePolicy::Tolerate)
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn fatal_failure_carries_description_and_stderr() {
        let fake = FakeExec::default();
        fake.fail("systemctl --user start x", "unit not found");
        let runner = ProcessRunner::new(fake);
        let err = runner
            .run(&["systemctl", "--user", "start", "x"], "Failed to start service", FailurePolicy::Fatal)
            .await
            .unwrap_err();
        assert_eq!(err.description, "Failed to start service");
        assert!(err.diagnostic.contains("unit not found"));
    }

    #[tokio::test]
    async fn spawn_failure_is_classified_like_exit_failure() {
        let fake = FakeExec::default();
        fake.unavailable("podman images -q img");
        let runner = ProcessRunner::new(fake);
        assert!(runner.query(&["podman", "images", "-q", "img"]).await.is_none());
        let ok = runner
            .run(&["podman", "images", "-q", "img"], "probe", FailurePolicy::Tolerate)
            .await
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn local_setup_errors_get_a_hint() {
        assert!(stderr_hint("podman", "Error: permission denied while reading")
            .is_some_and(|h| h.contains("podman")));
        assert!(stderr_hint("systemctl", "Failed to connect to bus: No medium found").is_some());
        assert!(stderr_hint("podman", "manifest unknown").is_none());
    }

    #[tokio::test]
    async fn spinner_is_cleared_before_failure_is_reported() {
        let fake = FakeExec::default();
        fake.fail("podman build -t img /src", "boom");
        let runner = ProcessRunner::new(fake);
        let spinner = ProgressBar::hidden();
        let ok = runner
            .run_with_spinner(
                &["podman", "build", "-t", "img", "/src"],
                "Failed to build image",
                FailurePolicy::Tolerate,
                &spinner,
            )
            .await
            .unwrap();
        assert!(!ok);
        assert!(spinner.is_finished());
    }

    #[test]
    fn unit_not_found_is_not_a_setup_problem() {
        assert!(stderr_hint("systemctl", "Unit jupyter-lab.service not found.").is_none());
    }

    #[tokio::test]
    async fn missing_program_hint_names_that_program() {
        let fake = FakeExec::default();
        fake.unavailable("systemctl --user start x");
        let runner = ProcessRunner::new(fake);
        let err = runner
            .run(&["systemctl", "--user", "start", "x"], "Failed to start service", FailurePolicy::Fatal)
            .await
            .unwrap_err();
        assert!(err.diagnostic.contains("systemctl is not installed or not on PATH"));
        assert!(!err.diagnostic.contains("podman"));
    }
}

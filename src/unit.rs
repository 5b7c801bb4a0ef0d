use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::{Config, ConfigError};
use crate::paths::{PlatformPaths, CONTAINER_NAME};
use crate::prepare::write_atomic;
use crate::runner::{Exec, ProcessRunner};
use crate::service::ServiceController;
use crate::templates::{self, SERVICE_UNIT};
use crate::ui;

const PODMAN_BIN: &str = "/usr/bin/podman";
const RESTART_SEC: u32 = 5;
const STOP_GRACE_SECS: u32 = 10;

/// Escape a value placed inside a quoted `Environment=` assignment.
fn escape_env(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('%', "%%")
}

/// Escape a value placed on an `Exec*=` line, where `$` is also expanded.
fn escape_exec(value: &str) -> String {
    escape_env(value).replace('$', "$$")
}

/// Render the unit file for `config`. Pure: the same inputs always give the
/// same text.
pub fn render_unit(config: &Config, paths: &PlatformPaths) -> String {
    let notebooks = config.paths.notebooks_dir.as_str();
    let vars = HashMap::from([
        ("RESTART_SEC", RESTART_SEC.to_string()),
        ("STOP_GRACE", STOP_GRACE_SECS.to_string()),
        ("PODMAN", PODMAN_BIN.to_string()),
        ("CONTAINER", CONTAINER_NAME.to_string()),
        ("NOTEBOOKS_DIR", escape_env(notebooks)),
        ("API_KEY", escape_env(&config.ai.api_key)),
        ("BASE_URL", escape_env(&config.ai.base_url)),
        ("NOTEBOOKS_MOUNT", escape_exec(notebooks)),
        ("CACHE_MOUNT", escape_exec(&paths.cache_dir.to_string_lossy())),
        ("CONFIG_MOUNT", escape_exec(&paths.config_dir.to_string_lossy())),
        ("IMAGE", escape_exec(&config.container.image_name)),
    ]);
    templates::render(SERVICE_UNIT, &vars)
}

/// Writes the unit file and has the service manager pick it up.
pub struct UnitInstaller<'a, E> {
    runner: &'a ProcessRunner<E>,
    paths: &'a PlatformPaths,
}

impl<'a, E: Exec> UnitInstaller<'a, E> {
    pub fn new(runner: &'a ProcessRunner<E>, paths: &'a PlatformPaths) -> Self {
        Self { runner, paths }
    }

    /// Overwrite the unit file with a fresh rendering, then reload. A failed
    /// reload is tolerated; only a failed write is an error.
    pub async fn install(&self, config: &Config) -> Result<PathBuf, ConfigError> {
        ui::heading("Installing systemd service...");

        let unit = render_unit(config, self.paths);
        let path = self.paths.unit_file.clone();
        write_atomic(&path, &unit).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "unit file written");
        ui::success(&path.display().to_string());

        ServiceController::new(self.runner).reload().await;
        Ok(path)
    }
}

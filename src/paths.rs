use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "jupyter-lab";
pub const SERVICE_NAME: &str = "jupyter-lab.service";
pub const CONTAINER_NAME: &str = "jupyter-lab";
pub const TEMPLATE_DIR: &str = "jupyter_config_template";

/// Files copied from the template directory into the config dir.
const TEMPLATE_FILES: &[&str] = &["jupyter_lab_config.py", "ipython_kernel_config.py"];
/// Directory trees merged from the template directory into the config dir.
const TEMPLATE_TREES: &[&str] = &["ipython"];

/// Fixed on-disk layout for one user's deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPaths {
    pub home: PathBuf,
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
    pub unit_file: PathBuf,
    pub project_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve the layout for the current user.
    pub fn discover(project_dir: Option<PathBuf>) -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let project_dir = match project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("could not determine working directory")?,
        };
        Ok(Self::from_home(home, project_dir))
    }

    /// Build the layout under an arbitrary home directory.
    pub fn from_home(home: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let config_dir = home.join(".config").join(APP_NAME);
        let data_dir = home.join(".local").join("share").join(APP_NAME);
        Self {
            config_file: config_dir.join("config.toml"),
            cache_dir: data_dir.join(".uv-cache"),
            log_dir: data_dir.join("logs"),
            unit_file: home
                .join(".config")
                .join("systemd")
                .join("user")
                .join(SERVICE_NAME),
            config_dir,
            home,
            project_dir: project_dir.into(),
        }
    }

    pub fn template_root(&self) -> PathBuf {
        self.project_dir.join(TEMPLATE_DIR)
    }

    /// (source, destination) pairs for single template files.
    pub fn template_files(&self) -> Vec<(PathBuf, PathBuf)> {
        self.template_pairs(TEMPLATE_FILES)
    }

    /// (source, destination) pairs for template directory trees.
    pub fn template_dirs(&self) -> Vec<(PathBuf, PathBuf)> {
        self.template_pairs(TEMPLATE_TREES)
    }

    fn template_pairs(&self, names: &[&str]) -> Vec<(PathBuf, PathBuf)> {
        let root = self.template_root();
        names
            .iter()
            .map(|name| (root.join(name), self.config_dir.join(name)))
            .collect()
    }

    /// Expand a leading `~/` against this layout's home directory.
    pub fn expand_home(&self, raw: &str) -> PathBuf {
        match raw.strip_prefix("~/") {
            Some(rest) => self.home.join(rest),
            None if raw == "~" => self.home.clone(),
            None => Path::new(raw).to_path_buf(),
        }
    }

    pub fn default_notebooks_dir(&self) -> PathBuf {
        self.home.join("Documents").join("jupyter")
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::prepare::write_atomic;

pub const DEFAULT_IMAGE: &str = "localhost/jupyter-lab:latest";
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_BASE_URL: &str = "https://api.z.ai/v1";
pub const DEFAULT_MODEL: &str = "glm-4-flash";
pub const KNOWN_MODELS: &[&str] = &["glm-4-flash", "glm-4", "glm-4-plus"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted deployer configuration (`config.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub paths: PathsConfig,
    pub container: ContainerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub notebooks_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub image_name: String,
    pub port: u16,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image_name: DEFAULT_IMAGE.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Returns whether every mandatory field is set, plus the dotted names
    /// of the ones that are not.
    pub fn is_complete(&self) -> (bool, Vec<&'static str>) {
        let mut missing = Vec::new();
        if self.ai.api_key.trim().is_empty() {
            missing.push("ai.api_key");
        }
        if self.ai.base_url.trim().is_empty() {
            missing.push("ai.base_url");
        }
        if self.paths.notebooks_dir.trim().is_empty() {
            missing.push("paths.notebooks_dir");
        }
        (missing.is_empty(), missing)
    }

    /// Human-readable labels for the missing mandatory fields.
    pub fn missing_labels(&self) -> Vec<&'static str> {
        self.is_complete()
            .1
            .into_iter()
            .map(|field| match field {
                "ai.api_key" => "AI API key",
                "ai.base_url" => "AI API base URL",
                "paths.notebooks_dir" => "Notebooks directory",
                other => other,
            })
            .collect()
    }
}

/// Loads and saves the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration. A missing or unreadable file yields an empty
    /// configuration.
    pub fn load(&self) -> Config {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no configuration file");
                return Config::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read configuration");
                return Config::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot parse configuration");
                Config::default()
            }
        }
    }

    /// Persist the configuration, replacing the previous file only once the
    /// new one is fully written.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        write_atomic(&self.path, &content).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_config() -> Config {
    Config {
        ai: AiConfig {
            api_key: "X".into(),
            base_url: "U".into(),
            model: "M".into(),
        },
        paths: PathsConfig {
            notebooks_dir: "/n".into(),
        },
        container: ContainerConfig {
            image_name: "I".into(),
            port: 8888,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TOML: &str = r#"
[ai]
api_key = "sk-test"
base_url = "https://api.example.com/v1"
model = "glm-4"

[paths]
notebooks_dir = "/home/ada/Documents/jupyter"
"#;

    #[test]
    fn parse_config_toml() {
        let config: Config = toml::from_str(SAMPLE_TOML).unwrap();
        assert_eq!(config.ai.api_key, "sk-test");
        assert_eq!(config.ai.model, "glm-4");
        assert_eq!(config.paths.notebooks_dir, "/home/ada/Documents/jupyter");
        // container section absent: defaults apply
        assert_eq!(config.container.image_name, DEFAULT_IMAGE);
        assert_eq!(config.container.port, DEFAULT_PORT);
    }

    #[test]
    fn empty_config_is_missing_all_mandatory_fields() {
        let (complete, missing) = Config::default().is_complete();
        assert!(!complete);
        assert_eq!(missing, vec!["ai.api_key", "ai.base_url", "paths.notebooks_dir"]);
    }

    #[test]
    fn incomplete_config_names_exactly_the_missing_fields() {
        let mut config = sample_config();
        config.ai.base_url = String::new();
        assert_eq!(config.is_complete(), (false, vec!["ai.base_url"]));

        let mut config = sample_config();
        config.ai.api_key = "  ".into();
        config.paths.notebooks_dir = String::new();
        assert_eq!(config.is_complete(), (false, vec!["ai.api_key", "paths.notebooks_dir"]));
        assert_eq!(config.missing_labels(), vec!["AI API key", "Notebooks directory"]);
    }

    #[test]
    fn container_fields_never_block_completeness() {
        let mut config = sample_config();
        config.container.image_name = String::new();
        config.container.port = 0;
        assert_eq!(config.is_complete(), (true, vec![]));
    }

    #[test]
    fn load_missing_file_yields_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nope").join("config.toml"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn load_garbage_yields_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is [not toml").unwrap();
        assert_eq!(ConfigStore::new(&path).load(), Config::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("jupyter-lab").join("config.toml"));
        let config = sample_config();
        store.save(&config).unwrap();
        assert_eq!(store.load(), config);
    }

    #[test]
    fn save_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));
        store.save(&sample_config()).unwrap();

        let mut updated = sample_config();
        updated.ai.model = "glm-4-plus".into();
        store.save(&updated).unwrap();

        assert_eq!(store.load().ai.model, "glm-4-plus");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));
        store.save(&sample_config()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}

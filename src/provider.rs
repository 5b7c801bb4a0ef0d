//! Sources of configuration values: an interactive prompt for first runs and
//! `--reconfigure`, and an environment-backed provider for unattended use.

use dialoguer::{theme::ColorfulTheme, Input, Password, Select};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{AiConfig, Config, PathsConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, KNOWN_MODELS};
use crate::paths::PlatformPaths;
use crate::templates::mask_secret;
use crate::ui;

pub const ENV_API_KEY: &str = "JUPYTER_DEPLOY_API_KEY";
pub const ENV_BASE_URL: &str = "JUPYTER_DEPLOY_BASE_URL";
pub const ENV_MODEL: &str = "JUPYTER_DEPLOY_MODEL";
pub const ENV_NOTEBOOKS_DIR: &str = "JUPYTER_DEPLOY_NOTEBOOKS_DIR";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API key is required")]
    MissingSecret,
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("prompt failed: {0}")]
    Prompt(String),
}

/// Turns a possibly partial configuration into a filled one, or refuses.
pub trait ConfigProvider {
    fn provide(&self, existing: &Config) -> Result<Config, ProviderError>;
}

/// Accepts only absolute http(s) URLs.
fn check_base_url(raw: &str) -> Result<(), String> {
    let url = raw.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(format!("expected an http(s) URL, got {:?}", url))
    }
}

/// Expands `~/` and requires the result to be absolute, since it becomes a
/// bind-mount source.
fn resolve_notebooks_dir(paths: &PlatformPaths, raw: &str) -> Result<PathBuf, String> {
    let dir = paths.expand_home(raw.trim());
    if dir.is_absolute() {
        Ok(dir)
    } else {
        Err(format!("{} is not an absolute path", dir.display()))
    }
}

/// Shared validation for values coming from any provider.
fn assemble(
    paths: &PlatformPaths,
    existing: &Config,
    api_key: String,
    base_url: String,
    model: String,
    notebooks_dir: String,
) -> Result<Config, ProviderError> {
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(ProviderError::MissingSecret);
    }

    check_base_url(&base_url).map_err(|reason| ProviderError::InvalidValue {
        field: "ai.base_url",
        reason,
    })?;
    let notebooks = resolve_notebooks_dir(paths, &notebooks_dir).map_err(|reason| {
        ProviderError::InvalidValue {
            field: "paths.notebooks_dir",
            reason,
        }
    })?;

    let model = match model.trim() {
        "" => DEFAULT_MODEL.to_string(),
        m => m.to_string(),
    };

    Ok(Config {
        ai: AiConfig {
            api_key,
            base_url: base_url.trim().to_string(),
            model,
        },
        paths: PathsConfig {
            notebooks_dir: notebooks.to_string_lossy().into_owned(),
        },
        container: existing.container.clone(),
    })
}

fn or_default(current: &str, default: &str) -> String {
    if current.trim().is_empty() {
        default.to_string()
    } else {
        current.to_string()
    }
}

/// Asks the operator on the terminal.
pub struct PromptProvider<'a> {
    paths: &'a PlatformPaths,
}

impl<'a> PromptProvider<'a> {
    pub fn new(paths: &'a PlatformPaths) -> Self {
        Self { paths }
    }

    fn prompt_err(e: dialoguer::Error) -> ProviderError {
        ProviderError::Prompt(e.to_string())
    }

    fn ask_api_key(&self, theme: &ColorfulTheme, current: &str) -> Result<String, ProviderError> {
        let prompt = if current.is_empty() {
            "Enter z.ai API key".to_string()
        } else {
            format!("Enter z.ai API key (empty keeps {})", mask_secret(current))
        };
        let key = Password::with_theme(theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|_| ProviderError::MissingSecret)?;
        let key = key.trim();
        Ok(if key.is_empty() { current.to_string() } else { key.to_string() })
    }

    fn ask_model(&self, theme: &ColorfulTheme, current: &str) -> Result<String, ProviderError> {
        let current = or_default(current, DEFAULT_MODEL);
        let mut items: Vec<&str> = KNOWN_MODELS.to_vec();
        items.push("(custom)");
        let custom_idx = items.len() - 1;
        let default_idx = KNOWN_MODELS
            .iter()
            .position(|m| *m == current)
            .unwrap_or(custom_idx);

        let picked = Select::with_theme(theme)
            .with_prompt("Select AI model")
            .items(&items)
            .default(default_idx)
            .interact()
            .map_err(Self::prompt_err)?;

        if picked != custom_idx {
            return Ok(items[picked].to_string());
        }
        let mut input = Input::<String>::with_theme(theme).with_prompt("Enter custom model name");
        if !KNOWN_MODELS.contains(&current.as_str()) {
            input = input.default(current);
        }
        input.interact_text().map_err(Self::prompt_err)
    }
}

impl ConfigProvider for PromptProvider<'_> {
    fn provide(&self, existing: &Config) -> Result<Config, ProviderError> {
        ui::heading("Configuration Setup");
        let theme = ColorfulTheme::default();

        let api_key = self.ask_api_key(&theme, &existing.ai.api_key)?;
        if api_key.is_empty() {
            return Err(ProviderError::MissingSecret);
        }

        let base_url = Input::<String>::with_theme(&theme)
            .with_prompt("AI API base URL")
            .default(or_default(&existing.ai.base_url, DEFAULT_BASE_URL))
            .validate_with(|input: &String| check_base_url(input))
            .interact_text()
            .map_err(Self::prompt_err)?;

        let model = self.ask_model(&theme, &existing.ai.model)?;

        let paths = self.paths;
        let default_dir = paths.default_notebooks_dir().to_string_lossy().into_owned();
        let notebooks_dir = Input::<String>::with_theme(&theme)
            .with_prompt("Notebooks directory")
            .default(or_default(&existing.paths.notebooks_dir, &default_dir))
            .validate_with(move |input: &String| resolve_notebooks_dir(paths, input).map(|_| ()))
            .interact_text()
            .map_err(Self::prompt_err)?;

        assemble(self.paths, existing, api_key, base_url, model, notebooks_dir)
    }
}

/// Reads `JUPYTER_DEPLOY_*` variables, falling back to the existing
/// configuration and then to built-in defaults. Never prompts.
pub struct EnvProvider<'a> {
    paths: &'a PlatformPaths,
    vars: HashMap<String, String>,
}

impl<'a> EnvProvider<'a> {
    pub fn from_env(paths: &'a PlatformPaths) -> Self {
        let vars = std::env::vars()
            .filter(|(k, _)| k.starts_with("JUPYTER_DEPLOY_"))
            .collect();
        Self { paths, vars }
    }

    #[cfg(test)]
    pub fn from_vars(paths: &'a PlatformPaths, vars: HashMap<String, String>) -> Self {
        Self { paths, vars }
    }

    fn pick(&self, var: &str, current: &str, default: &str) -> String {
        match self.vars.get(var).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => or_default(current, default),
        }
    }
}

impl ConfigProvider for EnvProvider<'_> {
    fn provide(&self, existing: &Config) -> Result<Config, ProviderError> {
        let default_dir = self.paths.default_notebooks_dir().to_string_lossy().into_owned();
        tracing::info!("reading configuration from environment");
        assemble(
            self.paths,
            existing,
            self.pick(ENV_API_KEY, &existing.ai.api_key, ""),
            self.pick(ENV_BASE_URL, &existing.ai.base_url, DEFAULT_BASE_URL),
            self.pick(ENV_MODEL, &existing.ai.model, DEFAULT_MODEL),
            self.pick(ENV_NOTEBOOKS_DIR, &existing.paths.notebooks_dir, &default_dir),
        )
    }
}

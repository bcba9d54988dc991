use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Deserialize;

use crate::theme::ThemeConfig;

pub const APP_KEY_ENV: &str = "SCHEDULE_APP_KEY";
pub const CLIENT_KEY_ENV: &str = "SCHEDULE_CLIENT_KEY";

const DEFAULT_BASE_URL: &str = "https://mbaas.api.nifcloud.com/2013-09-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Remote,
    Memory,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub base_url: String,
    pub application_key: Option<String>,
    pub client_key: Option<String>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            application_key: None,
            client_key: None,
            log_level: "info".to_string(),
            log_file: None,
            session_file: None,
            theme: ThemeConfig::default(),
        }
    }
}

impl Config {
    /// Reads the config file if present, then applies the credential
    /// environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        Self::parse(&content).wrap_err_with(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(APP_KEY_ENV).filter(|k| !k.is_empty()) {
            self.application_key = Some(key);
        }
        if let Some(key) = lookup(CLIENT_KEY_ENV).filter(|k| !k.is_empty()) {
            self.client_key = Some(key);
        }
    }

    /// Both keys, required by the remote backend.
    pub fn credentials(&self) -> Result<(String, String)> {
        match (&self.application_key, &self.client_key) {
            (Some(app), Some(client)) => Ok((app.clone(), client.clone())),
            _ => Err(eyre!(
                "missing backend credentials: set application_key and client_key in {} \
                 or the {} / {} environment variables",
                config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "config.toml".to_string()),
                APP_KEY_ENV,
                CLIENT_KEY_ENV,
            )),
        }
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.clone().or_else(|| {
            dirs::cache_dir().map(|d| d.join("schedule-tui").join("schedule-tui.log"))
        })
    }
}

/// `<config_dir>/schedule-tui/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("schedule-tui").join("config.toml"))
}

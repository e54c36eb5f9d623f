use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_API_URL: &str = "http://localhost:4000";
pub const API_URL_ENV: &str = "FINCHAT_API_URL";
pub const DEFAULT_LOG_FILTER: &str = "finchat=info";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory. A missing file gives defaults;
    /// an unreadable one gives defaults plus the error, for the caller to
    /// report once logging is up.
    pub fn load() -> (Self, Option<anyhow::Error>) {
        match Self::path() {
            Ok(path) => Self::load_or_default(&path),
            Err(e) => (Self::new(), Some(e)),
        }
    }

    pub fn load_or_default(path: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::new(), Some(e.context(format!("ignoring config file {:?}", path)))),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Write to the user config directory, returning where it went
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Backend base URL: explicit override, then `FINCHAT_API_URL`, then the
    /// config file, then the local development default.
    pub fn resolve_api_url(&self, cli_override: Option<&str>) -> String {
        let from_env = std::env::var(API_URL_ENV).ok();
        self.resolve_api_url_with(cli_override, from_env.as_deref())
    }

    fn resolve_api_url_with(&self, cli_override: Option<&str>, from_env: Option<&str>) -> String {
        [cli_override, from_env, self.api_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .to_string()
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("finchat").join("config.json"))
    }

    /// Where the TUI writes its logs, since stderr belongs to the terminal
    pub fn log_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?;

        Ok(cache_dir.join("finchat").join("finchat.log"))
    }
}

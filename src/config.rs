use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::backend::{normalize_base_url, DEFAULT_BACKEND_URL};

pub const BACKEND_URL_ENV: &str = "TALK2DAU_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub backend_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = match Self::get_config_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("{}; using default configuration", e);
                return Ok(Self::default());
            }
        };
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config at {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Failed to parse config at {}", config_path.display()))?;
        Ok(config)
    }

    /// Pick the backend base URL: CLI flag, then environment, then file, then default.
    pub fn resolve_backend_url(&self, cli_url: Option<&str>, env_url: Option<String>) -> String {
        let non_blank = |url: &String| !url.trim().is_empty();
        let chosen = cli_url
            .map(str::to_string)
            .filter(non_blank)
            .or(env_url.filter(non_blank))
            .or_else(|| self.backend_url.clone().filter(non_blank))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        normalize_base_url(&chosen)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("talk2dau").join("config.json"))
    }
}

//! Application configuration management.
//!
//! This module handles loading and saving the configuration: service
//! location, tenant, credentials, roster page size, the attendance edit
//! window and the colour bands used for attendance percentages.
//!
//! Configuration is stored at `~/.config/rollcall/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attendance::{ColorBands, EDIT_WINDOW_DAYS};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "rollcall";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Service base URL used when none is configured
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/v1";

/// Members fetched per roster page
const DEFAULT_PAGE_LIMIT: u32 = 300;

/// Environment variable overriding the bearer token
pub const TOKEN_ENV: &str = "ROLLCALL_TOKEN";

/// Environment variable overriding the service base URL
pub const API_URL_ENV: &str = "ROLLCALL_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub tenant_id: Option<String>,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub page_limit: u32,
    pub edit_window_days: i64,
    pub color_bands: ColorBands,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            tenant_id: None,
            token: None,
            user_id: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            edit_window_days: EDIT_WINDOW_DAYS,
            color_bands: ColorBands::default(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = Self::load_from(&path)?;
        Ok(config.with_overrides(std::env::var(TOKEN_ENV).ok(), std::env::var(API_URL_ENV).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(contents)?;
        config.color_bands = config.color_bands.normalized();
        config.edit_window_days = config.edit_window_days.max(0);
        Ok(config)
    }

    /// Apply token and base URL overrides, ignoring empty values
    pub fn with_overrides(mut self, token: Option<String>, api_base_url: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
        if let Some(url) = api_base_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(ref tenant) = self.tenant_id {
            path = path.join(tenant);
        }
        Ok(path)
    }
}

//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.subpartners.toml` files.

use crate::backend::RestConfig;
use crate::cli::OutputFormat;
use crate::models::DEFAULT_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".subpartners.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data service settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Dashboard settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Data service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST data service.
    #[serde(default = "default_url")]
    pub url: String,

    /// API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Table holding user records.
    #[serde(default = "default_users_table")]
    pub users_table: String,

    /// Table holding click events.
    #[serde(default = "default_clicks_table")]
    pub clicks_table: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
            users_table: default_users_table(),
            clicks_table: default_clicks_table(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_users_table() -> String {
    "users".to_string()
}

fn default_clicks_table() -> String {
    "clicks".to_string()
}

/// Dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Number of sub-partners to show.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Refresh interval for watch mode, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_seconds: Option<u64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            watch_seconds: None,
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.subpartners.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.backend.url = url.clone();
        }
        if let Some(ref api_key) = args.api_key {
            self.backend.api_key = Some(api_key.clone());
        }
        if let Some(timeout) = args.timeout {
            self.backend.timeout_seconds = timeout;
        }

        if let Some(limit) = args.limit {
            self.dashboard.limit = limit;
        }
        if let Some(watch) = args.watch {
            self.dashboard.watch_seconds = Some(watch);
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }
    }

    /// Check merged settings. Applies the same bounds as the command line.
    pub fn validate(&self) -> Result<()> {
        if self.dashboard.limit == 0 {
            anyhow::bail!("dashboard.limit must be at least 1");
        }

        if self.backend.timeout_seconds == 0 {
            anyhow::bail!("backend.timeout_seconds must be at least 1 second");
        }

        if self.dashboard.watch_seconds == Some(0) {
            anyhow::bail!("dashboard.watch_seconds must be at least 1 second");
        }

        Ok(())
    }

    /// Connection settings for the REST store.
    pub fn rest_config(&self) -> RestConfig {
        RestConfig {
            url: self.backend.url.clone(),
            api_key: self.backend.api_key.clone(),
            timeout_seconds: self.backend.timeout_seconds,
            users_table: self.backend.users_table.clone(),
            clicks_table: self.backend.clicks_table.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

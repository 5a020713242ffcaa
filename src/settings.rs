//! Runtime Settings
//!
//! Loading priority: CLI arguments > settings file > environment variables >
//! built-in defaults.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Result;

/// Runtime settings for the aggregator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Root directory for per-scope state (schemes, caches, overrides).
    pub data_dir: PathBuf,
    /// Timeout for one subscription fetch.
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
    /// Staleness threshold for the app-rule catalog.
    #[serde(with = "humantime_serde")]
    pub catalog_ttl: Duration,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            fetch_timeout: Duration::from_secs(5),
            catalog_ttl: Duration::from_secs(24 * 60 * 60),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, or defaults when it does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::info!("Loading settings from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            let settings: Settings = toml::from_str(&content)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
            settings.validate()?;
            Ok(settings)
        } else {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                path.display()
            );
            let settings = Self::load_from_env()?;
            settings.validate()?;
            Ok(settings)
        }
    }

    /// Load settings from environment variables on top of the defaults.
    pub fn load_from_env() -> Result<Self> {
        let mut settings = Settings::default();

        if let Ok(data_dir) = std::env::var("CLASHMIX_DATA_DIR") {
            settings.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(timeout) = std::env::var("CLASHMIX_FETCH_TIMEOUT") {
            settings.fetch_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid CLASHMIX_FETCH_TIMEOUT: {}", timeout))?;
        }

        if let Ok(ttl) = std::env::var("CLASHMIX_CATALOG_TTL") {
            settings.catalog_ttl = humantime::parse_duration(&ttl)
                .with_context(|| format!("Invalid CLASHMIX_CATALOG_TTL: {}", ttl))?;
        }

        if let Ok(log_level) = std::env::var("CLASHMIX_LOG_LEVEL") {
            settings.log_level = log_level;
        }

        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            bail!("data_dir must not be empty");
        }

        if self.fetch_timeout.as_secs() == 0 {
            bail!("fetch_timeout must be greater than 0");
        }

        if self.fetch_timeout.as_secs() > 60 {
            bail!("fetch_timeout cannot exceed 60 seconds");
        }

        if self.catalog_ttl.as_secs() < 60 {
            bail!("catalog_ttl must be at least 1 minute");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            bail!(
                "log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments (highest priority).
    pub fn merge_with_cli_args(&mut self, data_dir: Option<&Path>, log_level: Option<&str>) {
        if let Some(dir) = data_dir {
            self.data_dir = dir.to_path_buf();
            tracing::info!("CLI override: data dir set to {}", dir.display());
        }

        if let Some(level) = log_level {
            self.log_level = level.to_string();
            tracing::info!("CLI override: log level set to {}", level);
        }
    }
}

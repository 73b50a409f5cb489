//! Application settings and copy configuration
//!
//! Settings are read from `config.toml` in the user's config directory and
//! fall back to defaults when the file is missing.

pub mod copy_config;

pub use copy_config::{ConfigError, CopyConfig, DestinationOverrides};

use crate::api::{ResilienceConfig, RetryConfig, TimeoutRetry};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "hub-migrate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Where logs go when no `--log-file` is given
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_poll_delay_ms")]
    pub timeout_poll_delay_ms: u64,
    #[serde(default = "default_timeout_max_retries")]
    pub timeout_max_retries: u32,
    #[serde(default = "default_request_retries")]
    pub request_retries: u32,
}

fn default_api_url() -> String {
    "https://api.hub.example/v2/content".to_string()
}

fn default_auth_url() -> String {
    "https://auth.hub.example/oauth/token".to_string()
}

fn default_poll_delay_ms() -> u64 {
    1000
}

fn default_timeout_max_retries() -> u32 {
    30
}

fn default_request_retries() -> u32 {
    3
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            auth_url: default_auth_url(),
            log_directory: None,
            timeout_poll_delay_ms: default_poll_delay_ms(),
            timeout_max_retries: default_timeout_max_retries(),
            request_retries: default_request_retries(),
        }
    }
}

impl AppSettings {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join(APP_DIR)
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(format!(".{}", APP_DIR))
        };
        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        debug!("Loading settings from: {:?}", config_path);

        if !config_path.exists() {
            info!("Settings file doesn't exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read settings file: {:?}", config_path))?;
        let settings: AppSettings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", config_path))?;
        Ok(settings)
    }

    /// Directory for action logs, `~/.hub-migrate/logs` unless configured
    pub fn log_directory(&self) -> PathBuf {
        self.log_directory.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(format!(".{}", APP_DIR))
                .join("logs")
        })
    }

    /// Default log path for a command, e.g. `hub-clone-20240101T120000.log`
    pub fn default_log_path(&self, command: &str, action: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%dT%H%M%S");
        self.log_directory()
            .join(format!("{}-{}-{}.log", command, action, timestamp))
    }

    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            retry: RetryConfig {
                max_attempts: self.request_retries.max(1),
                ..RetryConfig::default()
            },
            timeout: TimeoutRetry::new(
                Duration::from_millis(self.timeout_poll_delay_ms),
                self.timeout_max_retries,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_max_retries = 5\nlog_directory = \"/tmp/logs\"\n").unwrap();

        let settings = AppSettings::load_from(&path).unwrap();
        assert_eq!(settings.timeout_max_retries, 5);
        assert_eq!(settings.timeout_poll_delay_ms, 1000);
        assert_eq!(settings.log_directory(), PathBuf::from("/tmp/logs"));

        let log_path = settings.default_log_path("hub", "clone");
        assert!(log_path.starts_with("/tmp/logs"));
        assert!(log_path.to_string_lossy().ends_with(".log"));
    }

    #[test]
    fn test_resilience_from_settings() {
        let settings = AppSettings {
            timeout_poll_delay_ms: 10,
            timeout_max_retries: 4,
            request_retries: 0,
            ..AppSettings::default()
        };
        let resilience = settings.resilience();
        assert_eq!(resilience.timeout.delay, Duration::from_millis(10));
        assert_eq!(resilience.timeout.max_retries, 4);
        assert_eq!(resilience.retry.max_attempts, 1);
    }
}

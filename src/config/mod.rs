//! Configuration module
//!
//! Application settings, configuration files, run profiles and environment
//! overrides.

#![allow(dead_code)]

pub mod env;
pub mod file;
pub mod profile;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub use env::EnvConfig;
pub use file::ConfigFile;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session timeout in milliseconds
    pub timeout_ms: u64,

    /// Setup/run/teardown cycles per suite
    pub retry_attempts: u32,

    /// Base delay between retry cycles in milliseconds
    pub retry_backoff_ms: u64,

    /// Running sessions before the engine reports unhealthy
    pub max_concurrent_sessions: usize,

    /// Log ring buffer capacity per session
    pub max_logs_per_session: usize,

    /// Age in seconds after which finished sessions and stored results are purged
    pub session_max_age_secs: u64,

    /// Default log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 300_000,
            retry_attempts: 1,
            retry_backoff_ms: 1000,
            max_concurrent_sessions: 10,
            max_logs_per_session: 1000,
            session_max_age_secs: 3600,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Self = if file::is_yaml_file(path) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if file::is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    /// Apply `SUITE_ORCH_*` overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(timeout) = env.timeout {
            self.timeout_ms = timeout;
        }
        if let Some(retries) = env.retries {
            self.retry_attempts = retries;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.timeout_ms, 300_000);
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.retry_backoff_ms, 1000);
        assert_eq!(config.max_concurrent_sessions, 10);
        assert_eq!(config.max_logs_per_session, 1000);
        assert_eq!(config.session_max_age(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("timeout_ms: 5000\n").unwrap();
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.json");

        let config = AppConfig {
            retry_attempts: 3,
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_apply_env() {
        let mut config = AppConfig::default();
        let env = EnvConfig {
            timeout: Some(1000),
            retries: Some(4),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        config.apply_env(&env);

        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.retry_attempts, 4);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.retry_backoff_ms, 1000);
    }
}

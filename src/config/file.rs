//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::profile::RunProfile;
use super::AppConfig;
use crate::error::OrchestratorError;
use crate::suite::{ScriptedCase, ScriptedSuiteSpec};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./suite-orchestrator.yaml",
    "./suite-orchestrator.yml",
    "./.suite-orchestrator.yaml",
    "./.suite-orchestrator/config.yaml",
    "~/.config/suite-orchestrator/config.yaml",
    "~/.suite-orchestrator.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Full configuration file structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Scripted suites to register
    #[serde(default)]
    pub suites: Vec<ScriptedSuiteSpec>,

    /// Run profiles
    #[serde(default)]
    pub profiles: Vec<RunProfile>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            suites: Vec::new(),
            profiles: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            bail!("Unsupported config version: {}", self.version);
        }

        let mut suite_ids = HashSet::new();
        for suite in &self.suites {
            if !suite_ids.insert(suite.id.as_str()) {
                bail!("Duplicate suite id '{}'", suite.id);
            }
        }

        for suite in &self.suites {
            for dependency in &suite.dependencies {
                if !suite_ids.contains(dependency.as_str()) {
                    return Err(OrchestratorError::Configuration(dependency.clone()))
                        .with_context(|| format!("Invalid dependency of suite '{}'", suite.id));
                }
            }
        }

        let mut profile_names = HashSet::new();
        for profile in &self.profiles {
            if !profile_names.insert(profile.name.as_str()) {
                bail!("Duplicate profile name '{}'", profile.name);
            }
            for suite in &profile.suites {
                if !suite_ids.contains(suite.as_str()) {
                    return Err(OrchestratorError::Configuration(suite.clone()))
                        .with_context(|| format!("Invalid suite in profile '{}'", profile.name));
                }
            }
        }

        Ok(())
    }

    /// Generate example configuration
    pub fn example() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            suites: vec![
                ScriptedSuiteSpec::new("authentication", "Authentication")
                    .with_description("Sign-up, login and token refresh")
                    .with_setup_delay(50)
                    .with_case(ScriptedCase::passing("auth_signup", "Rider sign-up", 120))
                    .with_case(ScriptedCase::passing("auth_login", "Rider login", 80))
                    .with_case(ScriptedCase::passing("auth_refresh", "Token refresh", 40)),
                ScriptedSuiteSpec::new("messaging", "Messaging")
                    .with_description("Rider and driver chat")
                    .with_dependency("authentication")
                    .flaky(1)
                    .with_case(ScriptedCase::passing("chat_send", "Send message", 90))
                    .with_case(ScriptedCase::passing("chat_history", "Load history", 60)),
                ScriptedSuiteSpec::new("booking", "Booking")
                    .with_description("Fare quote, ride request and cancellation")
                    .with_dependency("authentication")
                    .with_case(ScriptedCase::passing("book_quote", "Fare quote", 150))
                    .with_case(ScriptedCase::passing("book_request", "Ride request", 200))
                    .with_case(ScriptedCase::failing(
                        "book_cancel",
                        "Ride cancellation",
                        110,
                        "Cancellation fee not applied",
                    )),
            ],
            profiles: vec![RunProfile::smoke(), RunProfile::full()],
        }
    }

    /// Get suite description by id
    pub fn suite(&self, id: &str) -> Option<&ScriptedSuiteSpec> {
        self.suites.iter().find(|s| s.id == id)
    }

    /// Get run profile by name
    pub fn profile(&self, name: &str) -> Option<&RunProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(&mut self, other: ConfigFile) {
        let defaults = AppConfig::default();
        if other.app.timeout_ms != defaults.timeout_ms {
            self.app.timeout_ms = other.app.timeout_ms;
        }
        if other.app.retry_attempts != defaults.retry_attempts {
            self.app.retry_attempts = other.app.retry_attempts;
        }
        if other.app.retry_backoff_ms != defaults.retry_backoff_ms {
            self.app.retry_backoff_ms = other.app.retry_backoff_ms;
        }
        if other.app.max_concurrent_sessions != defaults.max_concurrent_sessions {
            self.app.max_concurrent_sessions = other.app.max_concurrent_sessions;
        }
        if other.app.max_logs_per_session != defaults.max_logs_per_session {
            self.app.max_logs_per_session = other.app.max_logs_per_session;
        }
        if other.app.session_max_age_secs != defaults.session_max_age_secs {
            self.app.session_max_age_secs = other.app.session_max_age_secs;
        }
        if other.app.log_level != defaults.log_level {
            self.app.log_level = other.app.log_level;
        }

        for suite in other.suites {
            match self.suites.iter_mut().find(|s| s.id == suite.id) {
                Some(existing) => *existing = suite,
                None => self.suites.push(suite),
            }
        }
        for profile in other.profiles {
            match self.profiles.iter_mut().find(|p| p.name == profile.name) {
                Some(existing) => *existing = profile,
                None => self.profiles.push(profile),
            }
        }
    }
}

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.suites.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_is_valid() {
        let config = ConfigFile::example();
        assert_eq!(config.suites.len(), 3);
        assert!(config.profile("smoke").is_some());
        assert!(config.suite("booking").is_some());
        config.validate().unwrap();
    }

    #[test]
    fn test_config_file_save_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = ConfigFile::example();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_file_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        ConfigFile::example().save(&path).unwrap();
        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.profiles.len(), 2);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "version: \"9.9\"\n").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported config version"));
    }

    #[test]
    fn test_validate_unknown_profile_suite() {
        let mut config = ConfigFile::example();
        config.profiles.push(RunProfile::new("broken", ["payments"]));

        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("Test suite not found: payments"));
    }

    #[test]
    fn test_validate_duplicate_suite() {
        let mut config = ConfigFile::example();
        config.suites.push(ScriptedSuiteSpec::new("booking", "Booking again"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let mut config = ConfigFile::default();
        config
            .suites
            .push(ScriptedSuiteSpec::new("chat", "Chat").with_dependency("auth"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge() {
        let mut base = ConfigFile::example();
        let mut other = ConfigFile::default();
        other.app.retry_attempts = 5;
        other.suites.push(ScriptedSuiteSpec::new("payments", "Payments"));
        other
            .suites
            .push(ScriptedSuiteSpec::new("booking", "Booking v2"));

        base.merge(other);

        assert_eq!(base.app.retry_attempts, 5);
        assert_eq!(base.app.timeout_ms, 300_000);
        assert_eq!(base.suites.len(), 4);
        assert_eq!(base.suite("booking").unwrap().name, "Booking v2");
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
        assert!(is_yaml_file(Path::new("a.yml")));
        assert!(!is_yaml_file(Path::new("a.json")));
    }
}

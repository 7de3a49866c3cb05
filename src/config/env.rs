//! Environment variable configuration
//!
//! `SUITE_ORCH_*` overrides for the command line tool.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "SUITE_ORCH";

/// Configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Session timeout in ms from SUITE_ORCH_TIMEOUT
    pub timeout: Option<u64>,
    /// Retry attempts from SUITE_ORCH_RETRIES
    pub retries: Option<u32>,
    /// Parallel from SUITE_ORCH_PARALLEL
    pub parallel: Option<bool>,
    /// Config file from SUITE_ORCH_CONFIG
    pub config_file: Option<String>,
    /// Log level from SUITE_ORCH_LOG_LEVEL
    pub log_level: Option<String>,
    /// Report format from SUITE_ORCH_FORMAT
    pub format: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            timeout: get_env_parse("TIMEOUT"),
            retries: get_env_parse("RETRIES"),
            parallel: get_env_bool("PARALLEL"),
            config_file: get_env("CONFIG"),
            log_level: get_env("LOG_LEVEL"),
            format: get_env("FORMAT"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.timeout.is_some()
            || self.retries.is_some()
            || self.parallel.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
            || self.format.is_some()
    }

    pub fn format_or(&self, default: &str) -> String {
        self.format.clone().unwrap_or_else(|| default.to_string())
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_TIMEOUT:    {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_RETRIES:    {:?}", ENV_PREFIX, self.retries);
        println!("  {}_PARALLEL:   {:?}", ENV_PREFIX, self.parallel);
        println!("  {}_CONFIG:     {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_LOG_LEVEL:  {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_FORMAT:     {:?}", ENV_PREFIX, self.format);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables (useful for testing)
#[derive(Default)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(self, timeout_ms: u64) -> Self {
        self.var("TIMEOUT", timeout_ms.to_string())
    }

    pub fn retries(self, retries: u32) -> Self {
        self.var("RETRIES", retries.to_string())
    }

    pub fn parallel(self, parallel: bool) -> Self {
        self.var("PARALLEL", parallel.to_string())
    }

    pub fn config_file(self, path: impl Into<String>) -> Self {
        self.var("CONFIG", path.into())
    }

    pub fn log_level(self, level: impl Into<String>) -> Self {
        self.var("LOG_LEVEL", level.into())
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        self.var("FORMAT", format.into())
    }

    fn var(mut self, name: &str, value: String) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all SUITE_ORCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_TIMEOUT     Session timeout in milliseconds");
    println!("  {ENV_PREFIX}_RETRIES     Setup/run/teardown cycles per suite");
    println!("  {ENV_PREFIX}_PARALLEL    Run suites concurrently (true/false)");
    println!("  {ENV_PREFIX}_CONFIG      Path to configuration file");
    println!("  {ENV_PREFIX}_LOG_LEVEL   Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_FORMAT      Report format (json, html, text, markdown)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_RETRIES=3");
    println!("  suite-orchestrator run --profile full");
}

//! Run profiles
//!
//! Named, reusable selections of suites together with execution options.

use serde::{Deserialize, Serialize};

use crate::models::{ExecutionConfig, ExecutionOptions};

/// Named suite selection with execution settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunProfile {
    /// Profile name
    pub name: String,
    /// Profile description
    #[serde(default)]
    pub description: String,
    /// Suite ids, in execution order
    pub suites: Vec<String>,
    /// Run suites concurrently
    #[serde(default)]
    pub parallel: bool,
    /// Session timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retry_attempts: Option<u32>,
}

impl RunProfile {
    /// Create a new run profile
    pub fn new<I, S>(name: impl Into<String>, suites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            suites: suites.into_iter().map(Into::into).collect(),
            parallel: false,
            timeout_ms: None,
            retry_attempts: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Quick check of the login path only
    pub fn smoke() -> Self {
        Self::new("smoke", ["authentication"])
            .with_description("Authentication only, single attempt")
            .with_timeout(60_000)
            .with_retry_attempts(1)
    }

    /// Every suite of the example configuration, concurrently
    pub fn full() -> Self {
        Self::new("full", ["authentication", "messaging", "booking"])
            .with_description("All suites in parallel with retries")
            .parallel()
            .with_retry_attempts(3)
    }

    /// Session configuration and per-call options for this profile
    pub fn to_execution(&self) -> (ExecutionConfig, ExecutionOptions) {
        let mut config = ExecutionConfig::new(self.suites.iter().cloned());
        config.timeout_ms = self.timeout_ms;
        config.retry_attempts = self.retry_attempts;

        (config, ExecutionOptions::new().parallel(self.parallel))
    }
}

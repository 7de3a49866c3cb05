//! Test suite contract and registry
//!
//! Suites are pluggable units implementing setup, run, teardown and a health
//! check. The engine only ever talks to them through [`TestSuite`].
//!
//! ## Lifecycle
//!
//! One attempt is a full `setup -> run_tests -> teardown` cycle. Any step
//! returning an error fails the attempt, and the engine may retry the whole
//! cycle.

#![allow(dead_code)]

mod registry;
mod scripted;

pub use registry::SuiteRegistry;
pub use scripted::{ScriptedCase, ScriptedSuite, ScriptedSuiteSpec};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::TestResult;

/// Contract every test suite implements
#[async_trait]
pub trait TestSuite: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Suite ids this suite relies on. Informational only, never enforced.
    fn dependencies(&self) -> &[String] {
        &[]
    }

    /// Expected duration of one cycle in milliseconds
    fn estimated_duration_ms(&self) -> u64 {
        0
    }

    async fn setup(&self) -> Result<()>;

    async fn run_tests(&self) -> Result<Vec<TestResult>>;

    async fn teardown(&self) -> Result<()>;

    async fn health_status(&self) -> HealthStatus;

    fn metadata(&self) -> SuiteMetadata {
        SuiteMetadata {
            id: self.id().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            estimated_duration_ms: self.estimated_duration_ms(),
            dependencies: self.dependencies().to_vec(),
        }
    }
}

/// Descriptive snapshot of a registered suite
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub estimated_duration_ms: u64,
    pub dependencies: Vec<String>,
}

/// Health classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health report of a suite or of the orchestrator itself
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HealthStatus {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Healthy,
            message: message.into(),
            details: None,
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Degraded,
            message: message.into(),
            details: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

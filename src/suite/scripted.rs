//! Scripted test suites
//!
//! A scripted suite replays a fixed list of cases with canned outcomes and
//! simulated durations. Suites are described in the configuration file so the
//! engine can be exercised from the command line.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::{HealthStatus, TestSuite};
use crate::models::{TestResult, TestStatus};

/// One canned test case
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptedCase {
    pub id: String,
    pub name: String,
    pub status: TestStatus,
    /// Simulated run time in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScriptedCase {
    pub fn passing(id: impl Into<String>, name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TestStatus::Passed,
            duration_ms,
            message: None,
        }
    }

    pub fn failing(
        id: impl Into<String>,
        name: impl Into<String>,
        duration_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TestStatus::Failed,
            duration_ms,
            message: Some(message.into()),
        }
    }

    fn to_result(&self) -> TestResult {
        let mut result = TestResult::new(&self.id, &self.name, self.status, self.duration_ms);
        result.message = self.message.clone();
        result
    }
}

/// Configuration-level description of a scripted suite
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptedSuiteSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Simulated setup time in milliseconds
    #[serde(default)]
    pub setup_delay_ms: u64,
    /// Every setup call fails
    #[serde(default)]
    pub fail_setup: bool,
    /// Number of initial run attempts that fail before the suite behaves
    #[serde(default)]
    pub flaky_attempts: u32,
    #[serde(default)]
    pub cases: Vec<ScriptedCase>,
}

impl ScriptedSuiteSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            dependencies: Vec::new(),
            setup_delay_ms: 0,
            fail_setup: false,
            flaky_attempts: 0,
            cases: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn with_case(mut self, case: ScriptedCase) -> Self {
        self.cases.push(case);
        self
    }

    pub fn with_setup_delay(mut self, ms: u64) -> Self {
        self.setup_delay_ms = ms;
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn flaky(mut self, attempts: u32) -> Self {
        self.flaky_attempts = attempts;
        self
    }
}

/// Suite replaying a [`ScriptedSuiteSpec`]
pub struct ScriptedSuite {
    spec: ScriptedSuiteSpec,
    setup_calls: AtomicU32,
    run_calls: AtomicU32,
    teardown_calls: AtomicU32,
}

impl ScriptedSuite {
    pub fn new(spec: ScriptedSuiteSpec) -> Self {
        Self {
            spec,
            setup_calls: AtomicU32::new(0),
            run_calls: AtomicU32::new(0),
            teardown_calls: AtomicU32::new(0),
        }
    }

    pub fn spec(&self) -> &ScriptedSuiteSpec {
        &self.spec
    }

    pub fn setup_calls(&self) -> u32 {
        self.setup_calls.load(Ordering::SeqCst)
    }

    pub fn run_calls(&self) -> u32 {
        self.run_calls.load(Ordering::SeqCst)
    }

    pub fn teardown_calls(&self) -> u32 {
        self.teardown_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestSuite for ScriptedSuite {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn dependencies(&self) -> &[String] {
        &self.spec.dependencies
    }

    fn estimated_duration_ms(&self) -> u64 {
        self.spec.setup_delay_ms + self.spec.cases.iter().map(|c| c.duration_ms).sum::<u64>()
    }

    async fn setup(&self) -> Result<()> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        if self.spec.setup_delay_ms > 0 {
            sleep(Duration::from_millis(self.spec.setup_delay_ms)).await;
        }
        if self.spec.fail_setup {
            bail!("Setup failed for suite {}", self.spec.id);
        }
        Ok(())
    }

    async fn run_tests(&self) -> Result<Vec<TestResult>> {
        let attempt = self.run_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.spec.flaky_attempts {
            bail!(
                "Suite {} failed on attempt {} of {} flaky attempts",
                self.spec.id,
                attempt,
                self.spec.flaky_attempts
            );
        }

        let mut results = Vec::with_capacity(self.spec.cases.len());
        for case in &self.spec.cases {
            if case.duration_ms > 0 {
                sleep(Duration::from_millis(case.duration_ms)).await;
            }
            debug!("Scripted case {} -> {}", case.id, case.status);
            results.push(case.to_result());
        }
        Ok(results)
    }

    async fn teardown(&self) -> Result<()> {
        self.teardown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_status(&self) -> HealthStatus {
        if self.spec.fail_setup {
            HealthStatus::degraded(format!("Suite {} is configured to fail setup", self.spec.id))
        } else {
            HealthStatus::healthy(format!("{} cases scripted", self.spec.cases.len()))
                .with_details(serde_json::json!({ "cases": self.spec.cases.len() }))
        }
    }
}

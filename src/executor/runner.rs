//! Suite runner
//!
//! Runs one suite through its setup, run and teardown cycle, retrying whole
//! cycles with linear backoff.

use anyhow::{anyhow, Context, Result};
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::OrchestratorError;
use crate::models::{ExecutionLog, LogLevel, TestResult};
use crate::results::ResultsStore;
use crate::suite::{SuiteRegistry, TestSuite};
use crate::utils::timer::Timer;

/// Outcome of running one suite
#[derive(Clone, Debug)]
pub struct SuiteRun {
    pub suite_id: String,
    /// Cycles started; 0 when the suite could not be resolved
    pub attempts: u32,
    pub results: Vec<TestResult>,
}

/// Runs suites on behalf of one session
pub struct SuiteRunner {
    registry: Arc<SuiteRegistry>,
    store: Arc<ResultsStore>,
    session_id: String,
    retry_attempts: u32,
    backoff: Duration,
}

impl SuiteRunner {
    pub fn new(
        registry: Arc<SuiteRegistry>,
        store: Arc<ResultsStore>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            store,
            session_id: session_id.into(),
            retry_attempts: 1,
            backoff: Duration::from_millis(1000),
        }
    }

    /// Cycles per suite; at least one
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Base delay; the wait after attempt `n` is `n * backoff`
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run a suite by id, collapsing failed attempts into one error result
    pub async fn run_suite(&self, suite_id: &str) -> SuiteRun {
        let Some(suite) = self.registry.lookup(suite_id).await else {
            let message = OrchestratorError::Configuration(suite_id.to_string()).to_string();
            warn!("[{}] {}", self.session_id, message);
            self.log(LogLevel::Error, suite_id, &message).await;

            return SuiteRun {
                suite_id: suite_id.to_string(),
                attempts: 0,
                results: vec![TestResult::error(suite_id, suite_id, message)],
            };
        };

        info!("[{}] Running suite {}", self.session_id, suite_id);
        let timer = Timer::start(format!("suite {suite_id}"));
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            match run_cycle(suite.as_ref()).await {
                Ok(results) => {
                    debug!(
                        "[{}] Suite {} produced {} results on attempt {}",
                        self.session_id,
                        suite_id,
                        results.len(),
                        attempt
                    );
                    timer.stop();
                    return SuiteRun {
                        suite_id: suite_id.to_string(),
                        attempts: attempt,
                        results,
                    };
                }
                Err(e) => {
                    warn!(
                        "[{}] Suite {} attempt {}/{} failed: {:#}",
                        self.session_id, suite_id, attempt, self.retry_attempts, e
                    );
                    self.log(
                        LogLevel::Warn,
                        suite_id,
                        &format!("Attempt {attempt}/{} failed: {e:#}", self.retry_attempts),
                    )
                    .await;
                    last_error = Some(e);

                    if attempt < self.retry_attempts {
                        sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        let last_message = last_error.map(|e| format!("{e:#}")).unwrap_or_default();
        let failure = OrchestratorError::SuiteExecution {
            suite: suite_id.to_string(),
            attempts: self.retry_attempts,
            message: last_message.clone(),
        };
        error!("[{}] {}", self.session_id, failure);
        self.log(LogLevel::Error, suite_id, &failure.to_string()).await;

        let result = TestResult::error(
            format!("{suite_id}_execution"),
            format!("{} execution", suite.name()),
            failure.to_string(),
        )
        .with_duration(timer.elapsed_ms())
        .with_details(json!({
            "suite_id": suite_id,
            "attempts": self.retry_attempts,
            "last_error": last_message,
        }));

        SuiteRun {
            suite_id: suite_id.to_string(),
            attempts: self.retry_attempts,
            results: vec![result],
        }
    }

    async fn log(&self, level: LogLevel, suite_id: &str, message: &str) {
        self.store
            .record_log(ExecutionLog::new(&self.session_id, level, message).with_test_id(suite_id))
            .await;
    }
}

/// One full attempt; a panicking suite counts as a failed attempt
async fn run_cycle(suite: &dyn TestSuite) -> Result<Vec<TestResult>> {
    match AssertUnwindSafe(cycle(suite)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(anyhow!("suite panicked: {}", panic_message(panic.as_ref()))),
    }
}

async fn cycle(suite: &dyn TestSuite) -> Result<Vec<TestResult>> {
    suite.setup().await.context("setup failed")?;
    let results = suite.run_tests().await.context("test run failed")?;
    suite.teardown().await.context("teardown failed")?;
    Ok(results)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

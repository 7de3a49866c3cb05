//! Parallel suite execution
//!
//! Launches every suite of a session as its own task and waits for all of
//! them. Completion order is not observable; results come back in the order
//! the suites were requested.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::runner::{SuiteRun, SuiteRunner};
use crate::models::TestResult;

/// Concurrent strategy over a shared [`SuiteRunner`]
pub struct ParallelExecutor {
    runner: Arc<SuiteRunner>,
}

impl ParallelExecutor {
    pub fn new(runner: Arc<SuiteRunner>) -> Self {
        Self { runner }
    }

    /// Run all suites concurrently
    pub async fn run_all(&self, suite_ids: &[String]) -> Vec<SuiteRun> {
        info!(
            "[{}] Running {} suites in parallel",
            self.runner.session_id(),
            suite_ids.len()
        );

        let start = Instant::now();
        let mut handles = Vec::with_capacity(suite_ids.len());

        for suite_id in suite_ids {
            let runner = self.runner.clone();
            let suite_id = suite_id.clone();

            handles.push(tokio::spawn(async move {
                debug!("Starting parallel execution of {}", suite_id);
                runner.run_suite(&suite_id).await
            }));
        }

        let runs: Vec<SuiteRun> = join_all(handles)
            .await
            .into_iter()
            .zip(suite_ids)
            .map(|(joined, suite_id)| match joined {
                Ok(run) => run,
                Err(e) => {
                    error!("Suite task {} aborted: {}", suite_id, e);
                    SuiteRun {
                        suite_id: suite_id.clone(),
                        attempts: 0,
                        results: vec![TestResult::error(
                            suite_id.as_str(),
                            suite_id.as_str(),
                            format!("Suite task aborted: {e}"),
                        )],
                    }
                }
            })
            .collect();

        info!(
            "[{}] Parallel execution completed in {}ms",
            self.runner.session_id(),
            start.elapsed().as_millis()
        );

        runs
    }
}

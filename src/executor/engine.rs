//! Session manager and execution engine
//!
//! Creates sessions, drives suite execution sequentially or in parallel,
//! races each session against its timeout, and hands final results to the
//! results store.
//!
//! ## Finalization
//!
//! A session leaves `running` exactly once. Natural completion, timeout,
//! operator stop and task failure all go through a check-and-set on the
//! session under the sessions write lock; whichever arrives first wins and
//! every later attempt is a no-op. Work that loses the race keeps running
//! until its current suite call returns, but its results are discarded.

use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::parallel::ParallelExecutor;
use super::runner::{SuiteRun, SuiteRunner};
use crate::config::AppConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::models::{
    ExecutionConfig, ExecutionOptions, ExecutionSession, LogLevel, SessionStatus, StatusSnapshot,
    TestResult,
};
use crate::results::ResultsStore;
use crate::suite::{HealthStatus, SuiteMetadata, SuiteRegistry};
use crate::utils::timer::cutoff;

/// Engine-wide defaults
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Session timeout when neither options nor config set one
    pub default_timeout_ms: u64,
    pub default_retry_attempts: u32,
    /// Base delay of the linear retry backoff
    pub retry_backoff_ms: u64,
    /// Running sessions at which the engine reports unhealthy
    pub max_concurrent_sessions: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 300_000,
            default_retry_attempts: 1,
            retry_backoff_ms: 1000,
            max_concurrent_sessions: 10,
        }
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_timeout_ms: config.timeout_ms,
            default_retry_attempts: config.retry_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
            max_concurrent_sessions: config.max_concurrent_sessions,
        }
    }
}

/// Orchestrator owning all sessions; cheap to clone
#[derive(Clone)]
pub struct ExecutionEngine {
    registry: Arc<SuiteRegistry>,
    store: Arc<ResultsStore>,
    sessions: Arc<RwLock<HashMap<String, ExecutionSession>>>,
    settings: EngineSettings,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<SuiteRegistry>, store: Arc<ResultsStore>) -> Self {
        Self::with_settings(registry, store, EngineSettings::default())
    }

    pub fn with_settings(
        registry: Arc<SuiteRegistry>,
        store: Arc<ResultsStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<SuiteRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ResultsStore> {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Create a running session and execute it in the background
    pub async fn start_execution(&self, config: ExecutionConfig, options: ExecutionOptions) -> String {
        let session_id = generate_session_id();
        let session = ExecutionSession::new(&session_id, config.clone());
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), session);

        info!(
            "Started session {} with {} suites (parallel: {})",
            session_id,
            config.test_suites.len(),
            options.parallel
        );
        self.store
            .add_execution_log(
                &session_id,
                LogLevel::Info,
                "Execution started",
                Some(json!({
                    "suites": config.test_suites,
                    "parallel": options.parallel,
                })),
            )
            .await;

        let engine = self.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            engine.execute(id, config, options).await;
        });

        session_id
    }

    /// Operator stop. Unknown ids are an error; terminal sessions are left as is.
    pub async fn stop_execution(&self, session_id: &str) -> OrchestratorResult<()> {
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| OrchestratorError::NotFound(session_id.to_string()))?;

            if !session.finalize(SessionStatus::Stopped) {
                debug!("Session {} already {}", session_id, session.status);
                return Ok(());
            }
            self.store
                .store_results(session_id, session.results.clone())
                .await;
        }

        warn!("Session {} stopped by operator", session_id);
        self.store
            .add_execution_log(session_id, LogLevel::Warn, "Execution stopped", None)
            .await;
        Ok(())
    }

    pub async fn get_execution_status(&self, session_id: &str) -> Option<StatusSnapshot> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(ExecutionSession::snapshot)
    }

    /// Snapshots of every known session, oldest first
    pub async fn list_sessions(&self) -> Vec<StatusSnapshot> {
        let mut snapshots: Vec<StatusSnapshot> = self
            .sessions
            .read()
            .await
            .values()
            .map(ExecutionSession::snapshot)
            .collect();
        snapshots.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        snapshots
    }

    pub async fn get_available_test_suites(&self) -> Vec<SuiteMetadata> {
        self.registry.list().await
    }

    /// Unhealthy once running sessions reach the concurrency ceiling
    pub async fn get_health_status(&self) -> HealthStatus {
        let (running, total) = {
            let sessions = self.sessions.read().await;
            let running = sessions.values().filter(|s| s.is_running()).count();
            (running, sessions.len())
        };
        let ceiling = self.settings.max_concurrent_sessions;

        let details = json!({
            "active_sessions": running,
            "total_sessions": total,
            "max_concurrent_sessions": ceiling,
            "registered_suites": self.registry.len().await,
        });

        let status = if running >= ceiling {
            HealthStatus::unhealthy(format!(
                "{running} running sessions at or over the limit of {ceiling}"
            ))
        } else {
            HealthStatus::healthy(format!("{running}/{ceiling} session slots in use"))
        };
        status.with_details(details)
    }

    /// Health check of every registered suite
    pub async fn get_suite_health(&self) -> Vec<(String, HealthStatus)> {
        self.registry.health_report().await
    }

    /// Remove sessions that ended more than `max_age` ago
    pub async fn cleanup_completed_sessions(&self, max_age: Duration) -> usize {
        let cutoff = cutoff(max_age);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.end_time.map(|end| end >= cutoff).unwrap_or(true));
        let removed = before - sessions.len();

        if removed > 0 {
            info!("Removed {} completed sessions", removed);
        }
        removed
    }

    /// Poll until the session is terminal; `None` if it is unknown
    pub async fn wait_for_completion(&self, session_id: &str, poll: Duration) -> Option<StatusSnapshot> {
        loop {
            let snapshot = self.get_execution_status(session_id).await?;
            if snapshot.status.is_terminal() {
                return Some(snapshot);
            }
            sleep(poll).await;
        }
    }

    async fn execute(self, session_id: String, config: ExecutionConfig, options: ExecutionOptions) {
        let timeout_ms = options
            .timeout_ms
            .or(config.timeout_ms)
            .unwrap_or(self.settings.default_timeout_ms);
        let retry_attempts = options
            .retry_attempts
            .or(config.retry_attempts)
            .unwrap_or(self.settings.default_retry_attempts);

        let runner = Arc::new(
            SuiteRunner::new(self.registry.clone(), self.store.clone(), &session_id)
                .retry_attempts(retry_attempts)
                .backoff(Duration::from_millis(self.settings.retry_backoff_ms)),
        );
        let parallel = options.parallel && config.test_suites.len() > 1;

        let work = {
            let engine = self.clone();
            let session_id = session_id.clone();
            let suites = config.test_suites.clone();
            tokio::spawn(async move {
                if parallel {
                    engine.run_parallel(&session_id, &suites, runner).await;
                } else {
                    engine.run_sequential(&session_id, &suites, runner).await;
                }
            })
        };

        // Dropping the handle on timeout detaches the work; its writes are gated
        tokio::select! {
            joined = work => match joined {
                Ok(()) => {
                    self.finalize(&session_id, SessionStatus::Completed, None).await;
                }
                Err(e) => {
                    let synthetic = TestResult::error(
                        "execution_error",
                        "Execution error",
                        format!("Execution error: {e}"),
                    );
                    self.finalize(&session_id, SessionStatus::Failed, Some(synthetic)).await;
                }
            },
            _ = sleep(Duration::from_millis(timeout_ms)) => {
                let synthetic = TestResult::error(
                    "execution_timeout",
                    "Execution timeout",
                    OrchestratorError::Timeout(timeout_ms).to_string(),
                )
                .with_duration(timeout_ms);
                self.finalize(&session_id, SessionStatus::Failed, Some(synthetic)).await;
            }
        }
    }

    async fn run_sequential(&self, session_id: &str, suites: &[String], runner: Arc<SuiteRunner>) {
        for suite_id in suites {
            {
                let mut sessions = self.sessions.write().await;
                match sessions.get_mut(session_id) {
                    Some(session) if session.is_running() => {
                        session.current_suite = Some(suite_id.clone());
                    }
                    _ => {
                        info!("Session {} no longer running, skipping remaining suites", session_id);
                        return;
                    }
                }
            }

            let run = runner.run_suite(suite_id).await;
            if !self.record_runs(session_id, vec![run], false).await {
                return;
            }
        }
    }

    async fn run_parallel(&self, session_id: &str, suites: &[String], runner: Arc<SuiteRunner>) {
        let runs = ParallelExecutor::new(runner).run_all(suites).await;
        self.record_runs(session_id, runs, true).await;
    }

    /// Append suite results to a running session. Returns false, discarding
    /// the runs, once the session has left `running`.
    async fn record_runs(&self, session_id: &str, runs: Vec<SuiteRun>, finish: bool) -> bool {
        let summaries: Vec<(String, usize, u32)> = runs
            .iter()
            .map(|run| (run.suite_id.clone(), run.results.len(), run.attempts))
            .collect();

        {
            let mut sessions = self.sessions.write().await;
            let Some(session) = sessions.get_mut(session_id).filter(|s| s.is_running()) else {
                debug!("Discarding late results for session {}", session_id);
                return false;
            };

            for run in runs {
                session.results.extend(run.results);
                if !finish {
                    session.progress.advance();
                }
            }
            if finish {
                session.progress.finish();
            }
        }

        for (suite_id, count, attempts) in summaries {
            self.store
                .add_execution_log(
                    session_id,
                    LogLevel::Info,
                    format!("Suite {suite_id} finished with {count} results"),
                    Some(json!({ "suite_id": suite_id, "attempts": attempts })),
                )
                .await;
        }
        true
    }

    /// First caller wins; returns whether this call moved the session
    async fn finalize(
        &self,
        session_id: &str,
        status: SessionStatus,
        synthetic: Option<TestResult>,
    ) -> bool {
        let count = {
            let mut sessions = self.sessions.write().await;
            let Some(session) = sessions.get_mut(session_id).filter(|s| s.is_running()) else {
                debug!("Session {} already finalized, ignoring {}", session_id, status);
                return false;
            };

            if let Some(result) = synthetic {
                session.results.push(result);
            }
            session.finalize(status);

            // Stored under the sessions lock: a terminal status implies stored results
            self.store
                .store_results(session_id, session.results.clone())
                .await;
            session.results.len()
        };

        info!("Session {} {} with {} results", session_id, status, count);
        let level = if status == SessionStatus::Completed {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        self.store
            .add_execution_log(session_id, level, format!("Execution {status}"), None)
            .await;
        true
    }
}

/// Unique session id: timestamp plus random suffix
fn generate_session_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let random: u64 = rand::random();
    format!("exec_{timestamp}_{random:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestStatus;
    use crate::suite::{HealthState, ScriptedCase, ScriptedSuite, ScriptedSuiteSpec, TestSuite};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const POLL: Duration = Duration::from_millis(5);

    /// Records lifecycle calls into a shared journal
    struct JournalSuite {
        id: String,
        journal: Arc<Mutex<Vec<String>>>,
        run_delay: Duration,
        results: Vec<TestResult>,
        crash: bool,
    }

    impl JournalSuite {
        fn new(id: &str, journal: Arc<Mutex<Vec<String>>>, results: Vec<TestResult>) -> Self {
            Self {
                id: id.to_string(),
                journal,
                run_delay: Duration::ZERO,
                results,
                crash: false,
            }
        }

        fn crashing(mut self) -> Self {
            self.crash = true;
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.run_delay = delay;
            self
        }

        fn note(&self, step: &str) {
            self.journal.lock().unwrap().push(format!("{}:{}", self.id, step));
        }
    }

    #[async_trait]
    impl TestSuite for JournalSuite {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            &self.id
        }

        fn description(&self) -> &str {
            "journal"
        }

        async fn setup(&self) -> Result<()> {
            self.note("setup");
            Ok(())
        }

        async fn run_tests(&self) -> Result<Vec<TestResult>> {
            self.note("run");
            if self.crash {
                panic!("{} crashed", self.id);
            }
            sleep(self.run_delay).await;
            self.note("run_done");
            Ok(self.results.clone())
        }

        async fn teardown(&self) -> Result<()> {
            self.note("teardown");
            Ok(())
        }

        async fn health_status(&self) -> HealthStatus {
            HealthStatus::healthy("ok")
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            retry_backoff_ms: 5,
            ..EngineSettings::default()
        }
    }

    async fn engine_with(suites: Vec<Arc<dyn TestSuite>>) -> ExecutionEngine {
        let registry = Arc::new(SuiteRegistry::new());
        for suite in suites {
            registry.register(suite).await;
        }
        ExecutionEngine::with_settings(registry, Arc::new(ResultsStore::new()), settings())
    }

    fn scripted(id: &str, cases: Vec<ScriptedCase>) -> Arc<dyn TestSuite> {
        let mut spec = ScriptedSuiteSpec::new(id, id);
        spec.cases = cases;
        Arc::new(ScriptedSuite::new(spec))
    }

    fn assert_progress_invariant(snapshot: &StatusSnapshot) {
        let p = snapshot.progress;
        assert!(p.completed <= p.total);
        if p.total > 0 {
            let expected = ((p.completed as f64 / p.total as f64) * 100.0).round() as u8;
            assert_eq!(p.percentage, expected);
        }
    }

    #[tokio::test]
    async fn test_sequential_scenario() {
        let engine = engine_with(vec![
            scripted(
                "A",
                vec![
                    ScriptedCase::passing("a1", "A1", 1),
                    ScriptedCase::passing("a2", "A2", 1),
                ],
            ),
            scripted("B", vec![ScriptedCase::failing("b1", "B1", 1, "nope")]),
        ])
        .await;

        let id = engine
            .start_execution(ExecutionConfig::new(["A", "B"]), ExecutionOptions::new())
            .await;
        let snapshot = engine.wait_for_completion(&id, POLL).await.unwrap();

        assert_eq!(snapshot.status, SessionStatus::Completed);
        assert_eq!(snapshot.results.len(), 3);
        assert_eq!(snapshot.progress.completed, 2);
        assert_eq!(snapshot.progress.percentage, 100);
        assert!(snapshot.end_time.is_some());
        assert!(snapshot.current_suite.is_none());
        assert_progress_invariant(&snapshot);

        let stored = engine.store().get_results(&id).await.unwrap();
        assert_eq!(stored, snapshot.results);
    }

    #[tokio::test]
    async fn test_sequential_order_and_single_cycle() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![
            Arc::new(JournalSuite::new("one", journal.clone(), vec![])),
            Arc::new(JournalSuite::new("two", journal.clone(), vec![])),
            Arc::new(JournalSuite::new("three", journal.clone(), vec![])),
        ])
        .await;

        let id = engine
            .start_execution(
                ExecutionConfig::new(["two", "three", "one"]),
                ExecutionOptions::new(),
            )
            .await;
        engine.wait_for_completion(&id, POLL).await.unwrap();

        let journal = journal.lock().unwrap().clone();
        let expected: Vec<String> = ["two", "three", "one"]
            .into_iter()
            .flat_map(|id| {
                ["setup", "run", "run_done", "teardown"]
                    .into_iter()
                    .map(move |step| format!("{id}:{step}"))
            })
            .collect();
        assert_eq!(journal, expected);
    }

    #[tokio::test]
    async fn test_sequential_progress_is_monotonic() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![
            Arc::new(JournalSuite::new("a", journal.clone(), vec![]).slow(Duration::from_millis(40))),
            Arc::new(JournalSuite::new("b", journal.clone(), vec![]).slow(Duration::from_millis(40))),
            Arc::new(JournalSuite::new("c", journal.clone(), vec![]).slow(Duration::from_millis(40))),
        ])
        .await;

        let id = engine
            .start_execution(ExecutionConfig::new(["a", "b", "c"]), ExecutionOptions::new())
            .await;

        let mut last = 0;
        loop {
            let snapshot = engine.get_execution_status(&id).await.unwrap();
            assert_progress_invariant(&snapshot);
            assert!(snapshot.progress.completed >= last);
            last = snapshot.progress.completed;
            if snapshot.status.is_terminal() {
                break;
            }
            sleep(POLL).await;
        }
        assert_eq!(last, 3);
    }

    #[tokio::test]
    async fn test_timeout_scenario() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![Arc::new(
            JournalSuite::new("slow", journal, vec![TestResult::passed("x", "X", 1)])
                .slow(Duration::from_millis(5000)),
        )])
        .await;

        let id = engine
            .start_execution(
                ExecutionConfig::new(["slow"]).with_timeout(100),
                ExecutionOptions::new(),
            )
            .await;
        let snapshot = engine.wait_for_completion(&id, POLL).await.unwrap();

        assert_eq!(snapshot.status, SessionStatus::Failed);
        assert_eq!(snapshot.results.len(), 1);
        let message = snapshot.results[0].message.as_deref().unwrap();
        assert!(message.contains("timeout"));
        assert!(snapshot.elapsed_ms() < 5000);
    }

    #[tokio::test]
    async fn test_option_timeout_overrides_config() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![Arc::new(
            JournalSuite::new("slow", journal, vec![]).slow(Duration::from_millis(300)),
        )])
        .await;

        let id = engine
            .start_execution(
                ExecutionConfig::new(["slow"]).with_timeout(60_000),
                ExecutionOptions::new().with_timeout(50),
            )
            .await;
        let snapshot = engine.wait_for_completion(&id, POLL).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Failed);
    }

    #[tokio::test]
    async fn test_stop_scenario() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![
            Arc::new(
                JournalSuite::new("first", journal.clone(), vec![TestResult::passed("f", "F", 1)])
                    .slow(Duration::from_millis(150)),
            ),
            Arc::new(JournalSuite::new("second", journal.clone(), vec![])),
        ])
        .await;

        let id = engine
            .start_execution(ExecutionConfig::new(["first", "second"]), ExecutionOptions::new())
            .await;
        sleep(Duration::from_millis(40)).await;

        engine.stop_execution(&id).await.unwrap();
        let stopped = engine.get_execution_status(&id).await.unwrap();
        assert_eq!(stopped.status, SessionStatus::Stopped);
        assert!(stopped.end_time.is_some());

        // Let the in-flight suite finish; its results must not land
        sleep(Duration::from_millis(300)).await;
        let later = engine.get_execution_status(&id).await.unwrap();
        assert_eq!(later, stopped);
        assert!(later.results.is_empty());

        let journal = journal.lock().unwrap().clone();
        assert!(journal.contains(&"first:run_done".to_string()));
        assert!(!journal.iter().any(|entry| entry.starts_with("second:")));

        // Stopping again is a no-op
        engine.stop_execution(&id).await.unwrap();
        assert_eq!(engine.get_execution_status(&id).await.unwrap(), stopped);
    }

    #[tokio::test]
    async fn test_timeout_discards_late_results() {
        for parallel in [false, true] {
            let journal = Arc::new(Mutex::new(Vec::new()));
            let engine = engine_with(vec![
                Arc::new(
                    JournalSuite::new("a", journal.clone(), vec![TestResult::passed("a", "A", 1)])
                        .slow(Duration::from_millis(150)),
                ),
                Arc::new(
                    JournalSuite::new("b", journal.clone(), vec![TestResult::passed("b", "B", 1)])
                        .slow(Duration::from_millis(150)),
                ),
            ])
            .await;

            let id = engine
                .start_execution(
                    ExecutionConfig::new(["a", "b"]).with_timeout(50),
                    ExecutionOptions::new().parallel(parallel),
                )
                .await;
            let timed_out = engine.wait_for_completion(&id, POLL).await.unwrap();
            assert_eq!(timed_out.status, SessionStatus::Failed, "parallel={parallel}");
            assert_eq!(timed_out.results.len(), 1);
            assert_eq!(timed_out.results[0].id, "execution_timeout");

            // The detached work finishes its current suite calls well inside this window
            sleep(Duration::from_millis(400)).await;
            assert!(journal.lock().unwrap().contains(&"a:run_done".to_string()));

            let later = engine.get_execution_status(&id).await.unwrap();
            assert_eq!(later, timed_out, "parallel={parallel}");
            assert_eq!(engine.store().get_results(&id).await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_stop_parallel_session() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![
            Arc::new(
                JournalSuite::new("a", journal.clone(), vec![TestResult::passed("a", "A", 1)])
                    .slow(Duration::from_millis(150)),
            ),
            Arc::new(
                JournalSuite::new("b", journal.clone(), vec![TestResult::passed("b", "B", 1)])
                    .slow(Duration::from_millis(150)),
            ),
        ])
        .await;

        let id = engine
            .start_execution(
                ExecutionConfig::new(["a", "b"]),
                ExecutionOptions::new().parallel(true),
            )
            .await;
        sleep(Duration::from_millis(40)).await;

        engine.stop_execution(&id).await.unwrap();
        let stopped = engine.get_execution_status(&id).await.unwrap();
        assert_eq!(stopped.status, SessionStatus::Stopped);
        assert!(stopped.results.is_empty());

        sleep(Duration::from_millis(400)).await;
        let journal = journal.lock().unwrap().clone();
        assert!(journal.contains(&"a:run_done".to_string()));
        assert!(journal.contains(&"b:run_done".to_string()));

        let later = engine.get_execution_status(&id).await.unwrap();
        assert_eq!(later, stopped);
        assert_eq!(later.progress.completed, 0);
        assert_eq!(engine.store().get_results(&id).await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_panicking_suite_does_not_abort_sequential_siblings() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![
            Arc::new(JournalSuite::new("boom", journal.clone(), vec![]).crashing()),
            scripted("ok", vec![ScriptedCase::passing("ok1", "Ok", 1)]),
        ])
        .await;

        let id = engine
            .start_execution(ExecutionConfig::new(["boom", "ok"]), ExecutionOptions::new())
            .await;
        let snapshot = engine.wait_for_completion(&id, POLL).await.unwrap();

        assert_eq!(snapshot.status, SessionStatus::Completed);
        assert_eq!(snapshot.progress.completed, 2);
        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.results[0].id, "boom_execution");
        assert_eq!(snapshot.results[0].status, TestStatus::Error);
        assert!(snapshot.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("boom crashed"));
        assert_eq!(snapshot.results[1].status, TestStatus::Passed);
    }

    #[tokio::test]
    async fn test_stop_unknown_session() {
        let engine = engine_with(vec![]).await;
        let err = engine.stop_execution("missing").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_suite_does_not_abort_siblings() {
        let engine = engine_with(vec![scripted("A", vec![ScriptedCase::passing("a1", "A1", 1)])]).await;

        let id = engine
            .start_execution(ExecutionConfig::new(["ghost", "A"]), ExecutionOptions::new())
            .await;
        let snapshot = engine.wait_for_completion(&id, POLL).await.unwrap();

        assert_eq!(snapshot.status, SessionStatus::Completed);
        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.results[0].status, TestStatus::Error);
        assert_eq!(snapshot.results[1].status, TestStatus::Passed);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_yields_one_result() {
        let flaky = Arc::new(ScriptedSuite::new(
            ScriptedSuiteSpec::new("flaky", "Flaky")
                .with_case(ScriptedCase::passing("f", "F", 0))
                .flaky(u32::MAX),
        ));
        let engine = engine_with(vec![flaky.clone() as Arc<dyn TestSuite>]).await;

        let id = engine
            .start_execution(
                ExecutionConfig::new(["flaky"]).with_retry_attempts(3),
                ExecutionOptions::new(),
            )
            .await;
        let snapshot = engine.wait_for_completion(&id, POLL).await.unwrap();

        assert_eq!(flaky.run_calls(), 3);
        assert_eq!(snapshot.status, SessionStatus::Completed);
        assert_eq!(snapshot.results.len(), 1);
        assert_eq!(snapshot.results[0].status, TestStatus::Error);
    }

    #[tokio::test]
    async fn test_parallel_progress_jumps_to_done() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(vec![
            Arc::new(
                JournalSuite::new("a", journal.clone(), vec![TestResult::passed("a", "A", 1)])
                    .slow(Duration::from_millis(100)),
            ),
            Arc::new(
                JournalSuite::new("b", journal.clone(), vec![TestResult::passed("b", "B", 1)])
                    .slow(Duration::from_millis(100)),
            ),
        ])
        .await;

        let id = engine
            .start_execution(
                ExecutionConfig::new(["a", "b"]),
                ExecutionOptions::new().parallel(true),
            )
            .await;

        sleep(Duration::from_millis(30)).await;
        let mid = engine.get_execution_status(&id).await.unwrap();
        assert_eq!(mid.status, SessionStatus::Running);
        assert_eq!(mid.progress.percentage, 0);

        let done = engine.wait_for_completion(&id, POLL).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.progress.completed, 2);
        assert_eq!(done.progress.percentage, 100);
        assert_eq!(done.results.len(), 2);
        assert!(done.elapsed_ms() < 200);
    }

    #[tokio::test]
    async fn test_status_snapshot_idempotent() {
        let engine = engine_with(vec![scripted("A", vec![ScriptedCase::passing("a", "A", 1)])]).await;
        let id = engine
            .start_execution(ExecutionConfig::new(["A"]), ExecutionOptions::new())
            .await;
        engine.wait_for_completion(&id, POLL).await.unwrap();

        let first = engine.get_execution_status(&id).await;
        let second = engine.get_execution_status(&id).await;
        assert_eq!(first, second);
        assert!(engine.get_execution_status("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_config_completes() {
        let engine = engine_with(vec![]).await;
        let id = engine
            .start_execution(ExecutionConfig::default(), ExecutionOptions::new())
            .await;
        let snapshot = engine.wait_for_completion(&id, POLL).await.unwrap();

        assert_eq!(snapshot.status, SessionStatus::Completed);
        assert_eq!(snapshot.progress.total, 0);
        assert_eq!(snapshot.progress.percentage, 100);
    }

    #[tokio::test]
    async fn test_cleanup_scenario() {
        let engine = engine_with(vec![]).await;
        {
            let mut old = ExecutionSession::new("old", ExecutionConfig::new(["A"]));
            old.finalize(SessionStatus::Completed);
            old.end_time = Some(Utc::now() - chrono::Duration::milliseconds(1000));

            let running = ExecutionSession::new("live", ExecutionConfig::new(["A"]));

            let mut sessions = engine.sessions.write().await;
            sessions.insert("old".to_string(), old);
            sessions.insert("live".to_string(), running);
        }

        let removed = engine.cleanup_completed_sessions(Duration::ZERO).await;

        assert_eq!(removed, 1);
        assert!(engine.get_execution_status("old").await.is_none());
        assert!(engine.get_execution_status("live").await.is_some());
    }

    #[tokio::test]
    async fn test_health_ceiling() {
        let engine = ExecutionEngine::with_settings(
            Arc::new(SuiteRegistry::new()),
            Arc::new(ResultsStore::new()),
            EngineSettings {
                max_concurrent_sessions: 2,
                ..settings()
            },
        );
        assert_eq!(engine.get_health_status().await.status, HealthState::Healthy);

        {
            let mut sessions = engine.sessions.write().await;
            for id in ["s1", "s2"] {
                sessions.insert(id.to_string(), ExecutionSession::new(id, ExecutionConfig::new(["A"])));
            }
        }

        let health = engine.get_health_status().await;
        assert_eq!(health.status, HealthState::Unhealthy);
        assert_eq!(health.details.unwrap()["active_sessions"], 2);
    }

    #[tokio::test]
    async fn test_session_logs_recorded() {
        let engine = engine_with(vec![scripted("A", vec![ScriptedCase::passing("a", "A", 1)])]).await;
        let id = engine
            .start_execution(ExecutionConfig::new(["A"]), ExecutionOptions::new())
            .await;
        engine.wait_for_completion(&id, POLL).await.unwrap();
        // The closing log entry lands just after the status flips
        sleep(Duration::from_millis(20)).await;

        let messages: Vec<String> = engine
            .store()
            .get_execution_logs(&id, None)
            .await
            .into_iter()
            .map(|log| log.message)
            .collect();
        assert_eq!(messages.first().map(String::as_str), Some("Execution started"));
        assert!(messages.contains(&"Suite A finished with 1 results".to_string()));
        assert!(messages.contains(&"Stored 1 test results".to_string()));
        assert_eq!(messages.last().map(String::as_str), Some("Execution completed"));
    }

    #[test]
    fn test_session_ids_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert!(a.starts_with("exec_"));
        assert_ne!(a, b);
    }
}

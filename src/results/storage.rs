//! Results storage and retrieval
//!
//! Keeps per-session result lists and log ring buffers in memory, memoizes
//! analytics, and moves data in and out through a JSON archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::OrchestratorResult;
use crate::models::{ExecutionLog, LogLevel, TestResult};
use crate::results::analytics::{AnalyticsSnapshot, TimeRange, ALL_RANGE_KEY};
use crate::results::report::{ReportFormat, ReportGenerator};
use crate::utils::timer::cutoff;

/// Default number of log entries kept per session
pub const DEFAULT_MAX_LOGS_PER_SESSION: usize = 1000;

#[derive(Default)]
struct StoreData {
    results: HashMap<String, Vec<TestResult>>,
    logs: HashMap<String, VecDeque<ExecutionLog>>,
}

/// Counts of collections removed by [`ResultsStore::cleanup`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStats {
    pub results_removed: usize,
    pub logs_removed: usize,
}

/// Archived data of one session
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionArchive {
    #[serde(default)]
    pub results: Vec<TestResult>,
    #[serde(default)]
    pub logs: Vec<ExecutionLog>,
}

/// Transport representation produced by export and consumed by import
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultsArchive {
    pub exported_at: DateTime<Utc>,
    pub sessions: BTreeMap<String, SessionArchive>,
}

/// In-memory results store shared across sessions
pub struct ResultsStore {
    data: RwLock<StoreData>,
    /// Lock order: `data` before `analytics_cache`
    analytics_cache: Mutex<HashMap<String, AnalyticsSnapshot>>,
    max_logs_per_session: usize,
}

impl Default for ResultsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsStore {
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_MAX_LOGS_PER_SESSION)
    }

    pub fn with_log_capacity(max_logs_per_session: usize) -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            analytics_cache: Mutex::new(HashMap::new()),
            max_logs_per_session: max_logs_per_session.max(1),
        }
    }

    /// Replace the stored results of a session
    pub async fn store_results(&self, session_id: &str, results: Vec<TestResult>) {
        let count = results.len();
        {
            let mut data = self.data.write().await;
            data.results.insert(session_id.to_string(), results);
            self.analytics_cache.lock().await.clear();
        }

        info!("Stored {} test results for session {}", count, session_id);
        self.add_execution_log(
            session_id,
            LogLevel::Info,
            format!("Stored {count} test results"),
            None,
        )
        .await;
    }

    pub async fn get_results(&self, session_id: &str) -> Option<Vec<TestResult>> {
        self.data.read().await.results.get(session_id).cloned()
    }

    pub async fn get_all_results(&self) -> HashMap<String, Vec<TestResult>> {
        self.data.read().await.results.clone()
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.data.read().await.results.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Render a report; `None` when the session has no stored results
    pub async fn generate_report(&self, session_id: &str, format: ReportFormat) -> Option<String> {
        let data = self.data.read().await;
        let results = data.results.get(session_id)?;
        Some(ReportGenerator::session_report(session_id, results, format))
    }

    /// Analytics over stored results, memoized per range
    pub async fn get_analytics(&self, range: Option<TimeRange>) -> AnalyticsSnapshot {
        let key = range
            .map(|r| r.cache_key())
            .unwrap_or_else(|| ALL_RANGE_KEY.to_string());

        // Holding the read lock keeps writers from invalidating mid-compute
        let data = self.data.read().await;
        let mut cache = self.analytics_cache.lock().await;
        if let Some(snapshot) = cache.get(&key) {
            debug!("Analytics cache hit for {}", key);
            return snapshot.clone();
        }

        let results: Vec<&TestResult> = data
            .results
            .values()
            .flatten()
            .filter(|r| range.map(|range| range.contains(&r.timestamp)).unwrap_or(true))
            .collect();

        debug!("Computing analytics for {} over {} results", key, results.len());
        let snapshot = AnalyticsSnapshot::compute(&results, key.clone());
        cache.insert(key, snapshot.clone());
        snapshot
    }

    /// Number of memoized analytics snapshots
    pub async fn cached_analytics(&self) -> usize {
        self.analytics_cache.lock().await.len()
    }

    pub async fn get_execution_logs(
        &self,
        session_id: &str,
        level: Option<LogLevel>,
    ) -> Vec<ExecutionLog> {
        let data = self.data.read().await;
        data.logs
            .get(session_id)
            .map(|logs| {
                logs.iter()
                    .filter(|log| level.map(|l| log.level == l).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn add_execution_log(
        &self,
        session_id: &str,
        level: LogLevel,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let log = ExecutionLog::new(session_id, level, message);
        let log = match details {
            Some(details) => log.with_details(details),
            None => log,
        };
        self.record_log(log).await;
    }

    /// Append a prepared entry, dropping the oldest beyond capacity
    pub async fn record_log(&self, log: ExecutionLog) {
        let mut data = self.data.write().await;
        let logs = data.logs.entry(log.session_id.clone()).or_default();
        logs.push_back(log);
        while logs.len() > self.max_logs_per_session {
            logs.pop_front();
        }
    }

    /// Purge results and logs older than `max_age`
    pub async fn cleanup(&self, max_age: Duration) -> CleanupStats {
        let cutoff = cutoff(max_age);
        let mut stats = CleanupStats::default();

        let mut data = self.data.write().await;

        let before = data.results.len();
        data.results.retain(|_, results| {
            // An empty collection has no newest timestamp and counts as stale
            results
                .iter()
                .map(|r| r.timestamp)
                .max()
                .map(|newest| newest >= cutoff)
                .unwrap_or(false)
        });
        stats.results_removed = before - data.results.len();

        let before = data.logs.len();
        data.logs.retain(|_, logs| {
            logs.retain(|log| log.timestamp >= cutoff);
            !logs.is_empty()
        });
        stats.logs_removed = before - data.logs.len();

        self.analytics_cache.lock().await.clear();

        info!(
            "Cleanup removed {} result collections and {} log collections",
            stats.results_removed, stats.logs_removed
        );
        stats
    }

    /// Serialize results and logs of the given sessions (all when `None`)
    pub async fn export_results(&self, session_ids: Option<&[String]>) -> OrchestratorResult<String> {
        let data = self.data.read().await;

        let ids: Vec<String> = match session_ids {
            Some(ids) => ids
                .iter()
                .filter(|id| data.results.contains_key(*id) || data.logs.contains_key(*id))
                .cloned()
                .collect(),
            None => {
                let mut ids: Vec<String> = data.results.keys().chain(data.logs.keys()).cloned().collect();
                ids.sort();
                ids.dedup();
                ids
            }
        };

        let mut sessions = BTreeMap::new();
        for id in ids {
            let results = data.results.get(&id).cloned().unwrap_or_default();
            let logs = data
                .logs
                .get(&id)
                .map(|l| l.iter().cloned().collect())
                .unwrap_or_default();
            sessions.insert(id, SessionArchive { results, logs });
        }

        let archive = ResultsArchive {
            exported_at: Utc::now(),
            sessions,
        };
        Ok(serde_json::to_string_pretty(&archive)?)
    }

    /// Restore sessions from an export payload, overwriting by id
    pub async fn import_results(&self, payload: &str) -> OrchestratorResult<usize> {
        let archive: ResultsArchive = serde_json::from_str(payload)?;
        let count = archive.sessions.len();

        let mut data = self.data.write().await;
        for (id, session) in archive.sessions {
            data.results.insert(id.clone(), session.results);

            let mut logs: VecDeque<ExecutionLog> = session.logs.into();
            while logs.len() > self.max_logs_per_session {
                logs.pop_front();
            }
            data.logs.insert(id, logs);
        }
        self.analytics_cache.lock().await.clear();

        info!("Imported {} sessions", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;

    fn results() -> Vec<TestResult> {
        vec![
            TestResult::passed("login", "Login", 100),
            TestResult::failed("pay", "Payment", 300, "declined"),
        ]
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let store = ResultsStore::new();
        store.store_results("s1", results()).await;

        assert_eq!(store.get_results("s1").await.unwrap().len(), 2);
        assert!(store.get_results("s2").await.is_none());
        assert_eq!(store.get_all_results().await.len(), 1);

        let logs = store.get_execution_logs("s1", Some(LogLevel::Info)).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "Stored 2 test results");
    }

    #[tokio::test]
    async fn test_store_replaces() {
        let store = ResultsStore::new();
        store.store_results("s1", results()).await;
        store
            .store_results("s1", vec![TestResult::passed("x", "X", 1)])
            .await;
        assert_eq!(store.get_results("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_analytics_cache_invalidated_on_write() {
        let store = ResultsStore::new();
        store.store_results("s1", results()).await;

        let first = store.get_analytics(None).await;
        assert_eq!(first.summary.total_tests, 2);
        assert_eq!(store.cached_analytics().await, 1);

        let again = store.get_analytics(None).await;
        assert_eq!(again.generated_at, first.generated_at);

        store
            .store_results("s2", vec![TestResult::passed("x", "X", 1)])
            .await;
        assert_eq!(store.cached_analytics().await, 0);
        assert_eq!(store.get_analytics(None).await.summary.total_tests, 3);
    }

    #[tokio::test]
    async fn test_analytics_range_filter() {
        let store = ResultsStore::new();
        let old = TestResult::passed("old", "Old", 1)
            .with_timestamp(Utc::now() - chrono::Duration::days(10));
        store
            .store_results("s1", vec![old, TestResult::passed("new", "New", 1)])
            .await;

        let recent = store
            .get_analytics(Some(TimeRange::last(chrono::Duration::days(1))))
            .await;
        assert_eq!(recent.summary.total_tests, 1);
        assert_eq!(store.get_analytics(None).await.summary.total_tests, 2);
        assert_eq!(store.cached_analytics().await, 2);
    }

    #[tokio::test]
    async fn test_log_ring_buffer() {
        let store = ResultsStore::new();
        for i in 0..1005 {
            store
                .add_execution_log("s1", LogLevel::Debug, format!("line {i}"), None)
                .await;
        }

        let logs = store.get_execution_logs("s1", None).await;
        assert_eq!(logs.len(), DEFAULT_MAX_LOGS_PER_SESSION);
        assert_eq!(logs[0].message, "line 5");
        assert_eq!(logs[999].message, "line 1004");
    }

    #[tokio::test]
    async fn test_log_level_filter() {
        let store = ResultsStore::new();
        store.add_execution_log("s1", LogLevel::Info, "start", None).await;
        store
            .record_log(ExecutionLog::new("s1", LogLevel::Error, "boom").with_test_id("pay"))
            .await;

        let errors = store.get_execution_logs("s1", Some(LogLevel::Error)).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].test_id.as_deref(), Some("pay"));
        assert_eq!(store.get_execution_logs("s1", None).await.len(), 2);
        assert!(store.get_execution_logs("missing", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_report_missing_session() {
        let store = ResultsStore::new();
        assert!(store.generate_report("nope", ReportFormat::Json).await.is_none());

        store.store_results("s1", results()).await;
        let report = store.generate_report("s1", ReportFormat::Text).await.unwrap();
        assert!(report.contains("2 tests"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_stale() {
        let store = ResultsStore::new();
        let stale = Utc::now() - chrono::Duration::hours(2);

        store
            .store_results(
                "old",
                vec![TestResult::passed("a", "A", 1).with_timestamp(stale)],
            )
            .await;
        store.store_results("fresh", results()).await;
        store
            .record_log(ExecutionLog {
                timestamp: stale,
                ..ExecutionLog::new("ghost", LogLevel::Info, "ancient")
            })
            .await;
        store.get_analytics(None).await;

        let stats = store.cleanup(Duration::from_secs(3600)).await;

        assert_eq!(stats.results_removed, 1);
        assert_eq!(stats.logs_removed, 1);
        assert!(store.get_results("old").await.is_none());
        assert!(store.get_results("fresh").await.is_some());
        assert!(store.get_execution_logs("ghost", None).await.is_empty());
        assert_eq!(store.cached_analytics().await, 0);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let source = ResultsStore::new();
        source.store_results("s1", results()).await;
        source
            .add_execution_log("s1", LogLevel::Warn, "retrying", None)
            .await;
        source.store_results("s2", results()).await;

        let payload = source
            .export_results(Some(&["s1".to_string()]))
            .await
            .unwrap();

        let target = ResultsStore::new();
        let imported = target.import_results(&payload).await.unwrap();

        assert_eq!(imported, 1);
        assert_eq!(target.get_results("s1").await, source.get_results("s1").await);
        assert_eq!(
            target.get_execution_logs("s1", None).await,
            source.get_execution_logs("s1", None).await
        );
        assert!(target.get_results("s2").await.is_none());
    }

    #[tokio::test]
    async fn test_export_skips_unknown_sessions() {
        let source = ResultsStore::new();
        source.store_results("s1", results()).await;

        let payload = source
            .export_results(Some(&["s1".to_string(), "ghost".to_string()]))
            .await
            .unwrap();
        let archive: ResultsArchive = serde_json::from_str(&payload).unwrap();
        assert_eq!(archive.sessions.keys().collect::<Vec<_>>(), vec!["s1"]);

        let target = ResultsStore::new();
        assert_eq!(target.import_results(&payload).await.unwrap(), 1);
        assert!(target.get_results("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_repeated_recent_range_hits_cache() {
        let store = ResultsStore::new();
        store.store_results("s1", results()).await;

        let range = TimeRange::last(chrono::Duration::days(1));
        store.get_analytics(Some(range)).await;
        store.get_analytics(Some(range)).await;
        assert_eq!(store.cached_analytics().await, 1);
    }

    #[tokio::test]
    async fn test_export_all_sessions() {
        let store = ResultsStore::new();
        store.store_results("a", results()).await;
        store.store_results("b", results()).await;

        let payload = store.export_results(None).await.unwrap();
        let archive: ResultsArchive = serde_json::from_str(&payload).unwrap();
        assert_eq!(archive.sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_import_malformed() {
        let store = ResultsStore::new();
        let err = store.import_results("{not json").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Parse(_)));
    }
}

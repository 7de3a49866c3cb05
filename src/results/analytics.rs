//! Analytics over stored test results
//!
//! Summaries, per-day trends, failure rankings and performance extremes. All
//! functions here are pure; memoization lives in the results store.

#![allow(dead_code)]

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::{TestResult, TestStatus};

/// Number of entries kept in failure and performance rankings
pub const RANKING_LIMIT: usize = 10;

/// Cache key used when no time range is given
pub const ALL_RANGE_KEY: &str = "all";

/// Counts by status plus derived rates
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Percentage of passed results (0-100)
    pub success_rate: f64,
    /// Mean duration in milliseconds
    pub average_duration: f64,
}

/// Results of one calendar day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyTrend {
    /// Day in `YYYY-MM-DD` form (UTC)
    pub date: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub success_rate: f64,
}

/// A test id ranked by how often it failed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub test_id: String,
    pub test_name: String,
    pub count: usize,
    pub last_failure: DateTime<Utc>,
}

/// Duration statistics of one test id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestPerformance {
    pub test_id: String,
    pub test_name: String,
    pub runs: usize,
    pub average_duration: f64,
    pub min_duration: u64,
    pub max_duration: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub slowest: Vec<TestPerformance>,
    pub fastest: Vec<TestPerformance>,
}

/// Inclusive window of result timestamps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Range covering the last `duration` up to now
    pub fn last(duration: chrono::Duration) -> Self {
        Self::ending_at(Utc::now(), duration)
    }

    /// Range of `duration` ending at `end`, truncated to whole seconds so
    /// repeated queries share a cache key
    pub fn ending_at(end: DateTime<Utc>, duration: chrono::Duration) -> Self {
        let end = end.with_nanosecond(0).unwrap_or(end);
        Self {
            start: end - duration,
            end,
        }
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        *timestamp >= self.start && *timestamp <= self.end
    }

    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Derived view over a set of results
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub range: String,
    pub generated_at: DateTime<Utc>,
    pub summary: TestSummary,
    pub trends: Vec<DailyTrend>,
    pub top_failures: Vec<FailureRecord>,
    pub performance: PerformanceReport,
}

impl AnalyticsSnapshot {
    pub fn compute(results: &[&TestResult], range: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            generated_at: Utc::now(),
            summary: calculate_summary(results),
            trends: calculate_trends(results),
            top_failures: top_failures(results, RANKING_LIMIT),
            performance: performance_extremes(results, RANKING_LIMIT),
        }
    }
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Counts, success rate and mean duration
pub fn calculate_summary(results: &[&TestResult]) -> TestSummary {
    let mut summary = TestSummary {
        total_tests: results.len(),
        ..Default::default()
    };

    let mut total_duration: u64 = 0;
    for result in results {
        match result.status {
            TestStatus::Passed => summary.passed += 1,
            TestStatus::Failed => summary.failed += 1,
            TestStatus::Skipped => summary.skipped += 1,
            TestStatus::Error => summary.errors += 1,
        }
        total_duration += result.duration;
    }

    summary.success_rate = rate(summary.passed, summary.total_tests);
    summary.average_duration = if results.is_empty() {
        0.0
    } else {
        total_duration as f64 / results.len() as f64
    };
    summary
}

/// Per-day counts, ascending by date
pub fn calculate_trends(results: &[&TestResult]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<String, DailyTrend> = BTreeMap::new();

    for result in results {
        let date = result.timestamp.format("%Y-%m-%d").to_string();
        let day = days.entry(date.clone()).or_insert_with(|| DailyTrend {
            date,
            total: 0,
            passed: 0,
            failed: 0,
            errors: 0,
            success_rate: 0.0,
        });

        day.total += 1;
        match result.status {
            TestStatus::Passed => day.passed += 1,
            TestStatus::Failed => day.failed += 1,
            TestStatus::Error => day.errors += 1,
            TestStatus::Skipped => {}
        }
    }

    days.into_values()
        .map(|mut day| {
            day.success_rate = rate(day.passed, day.total);
            day
        })
        .collect()
}

/// Test ids ranked by number of failed or errored results
pub fn top_failures(results: &[&TestResult], limit: usize) -> Vec<FailureRecord> {
    let mut failures: HashMap<&str, FailureRecord> = HashMap::new();

    for result in results.iter().filter(|r| r.status.is_failure()) {
        failures
            .entry(result.id.as_str())
            .and_modify(|record| {
                record.count += 1;
                if result.timestamp >= record.last_failure {
                    record.last_failure = result.timestamp;
                    record.test_name = result.name.clone();
                }
            })
            .or_insert_with(|| FailureRecord {
                test_id: result.id.clone(),
                test_name: result.name.clone(),
                count: 1,
                last_failure: result.timestamp,
            });
    }

    let mut ranked: Vec<FailureRecord> = failures.into_values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.test_id.cmp(&b.test_id)));
    ranked.truncate(limit);
    ranked
}

/// Slowest and fastest test ids by mean duration
pub fn performance_extremes(results: &[&TestResult], limit: usize) -> PerformanceReport {
    // (latest name, latest timestamp, durations)
    let mut per_test: HashMap<&str, (String, DateTime<Utc>, Vec<u64>)> = HashMap::new();

    for result in results {
        let entry = per_test
            .entry(result.id.as_str())
            .or_insert_with(|| (result.name.clone(), result.timestamp, Vec::new()));
        if result.timestamp >= entry.1 {
            entry.0 = result.name.clone();
            entry.1 = result.timestamp;
        }
        entry.2.push(result.duration);
    }

    let stats: Vec<TestPerformance> = per_test
        .into_iter()
        .map(|(id, (name, _, durations))| {
            let sum: u64 = durations.iter().sum();
            TestPerformance {
                test_id: id.to_string(),
                test_name: name,
                runs: durations.len(),
                average_duration: sum as f64 / durations.len() as f64,
                min_duration: durations.iter().copied().min().unwrap_or(0),
                max_duration: durations.iter().copied().max().unwrap_or(0),
            }
        })
        .collect();

    let by_average = |a: &TestPerformance, b: &TestPerformance| {
        a.average_duration
            .partial_cmp(&b.average_duration)
            .unwrap_or(Ordering::Equal)
    };

    let mut slowest = stats.clone();
    slowest.sort_by(|a, b| by_average(b, a).then_with(|| a.test_id.cmp(&b.test_id)));
    slowest.truncate(limit);

    let mut fastest = stats;
    fastest.sort_by(|a, b| by_average(a, b).then_with(|| a.test_id.cmp(&b.test_id)));
    fastest.truncate(limit);

    PerformanceReport { slowest, fastest }
}

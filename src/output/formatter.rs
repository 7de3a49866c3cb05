//! Output formatters for the command line
//!
//! Provides table, JSON, CSV and summary renderings of results, session
//! status, analytics and suite listings.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::models::{ExecutionLog, SessionStatus, StatusSnapshot, TestResult, TestStatus};
use crate::results::AnalyticsSnapshot;
use crate::suite::{HealthState, HealthStatus, SuiteMetadata};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Row layout of the CSV export
#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    status: &'a str,
    duration_ms: u64,
    timestamp: String,
    message: &'a str,
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a single test result
    pub fn format_result(&self, result: &TestResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_result_table(result),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Csv => results_csv(std::slice::from_ref(result)).unwrap_or_default(),
            OutputFormat::Summary => self.format_result_summary(result),
        }
    }

    fn status_label(&self, status: TestStatus) -> String {
        let label = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return label;
        }
        let color = match status {
            TestStatus::Passed => "32",
            TestStatus::Skipped => "33",
            TestStatus::Failed | TestStatus::Error => "31",
        };
        format!("\x1b[{color}m{label}\x1b[0m")
    }

    fn format_result_table(&self, result: &TestResult) -> String {
        format!(
            "{:24} {:32} {} [{:>6}ms]",
            truncate(&result.id, 24),
            truncate(&result.name, 32),
            self.status_label(result.status),
            result.duration
        )
    }

    fn format_result_summary(&self, result: &TestResult) -> String {
        format!(
            "{} {} ({}ms)",
            result.status.symbol(),
            result.name,
            result.duration
        )
    }

    /// Format a list of results
    pub fn format_results(&self, results: &[TestResult]) -> String {
        match self.format {
            OutputFormat::Table => self.format_results_table(results),
            OutputFormat::Json => serde_json::to_string(results).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(results).unwrap_or_default(),
            OutputFormat::Csv => results_csv(results).unwrap_or_default(),
            OutputFormat::Summary => {
                let passed = results.iter().filter(|r| r.status.is_success()).count();
                let duration: u64 = results.iter().map(|r| r.duration).sum();
                format!(
                    "{}/{} passed ({:.1}%) in {}ms",
                    passed,
                    results.len(),
                    percent(passed, results.len()),
                    duration
                )
            }
        }
    }

    fn format_results_table(&self, results: &[TestResult]) -> String {
        let mut output = String::new();

        output.push_str("\n┌──────────────────────────────────────────────────────────────────────────┐\n");
        output.push_str("│ Test Results                                                             │\n");
        output.push_str("├──────────────────────────────────────────────────────────────────────────┤\n");

        for result in results {
            output.push_str(&format!("  {}\n", self.format_result_table(result)));
            if let Some(message) = result.message.as_deref().filter(|_| result.status.is_failure()) {
                output.push_str(&format!("      └─ {message}\n"));
            }
        }

        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        output.push_str("├──────────────────────────────────────────────────────────────────────────┤\n");
        output.push_str(&format!(
            "  Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}\n",
            results.len(),
            count(TestStatus::Passed),
            count(TestStatus::Failed),
            count(TestStatus::Skipped),
            count(TestStatus::Error)
        ));
        output.push_str("└──────────────────────────────────────────────────────────────────────────┘\n");

        output
    }

    /// One-line progress view of a session
    pub fn format_progress(&self, snapshot: &StatusSnapshot) -> String {
        let filled = (snapshot.progress.percentage as usize / 5).min(20);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled));
        let current = snapshot.current_suite.as_deref().unwrap_or("-");

        format!(
            "[{}] {} {:3}% ({}/{}) {} {}",
            snapshot.session_id,
            bar,
            snapshot.progress.percentage,
            snapshot.progress.completed,
            snapshot.progress.total,
            self.session_label(snapshot.status),
            current
        )
    }

    fn session_label(&self, status: SessionStatus) -> String {
        if !self.colorize {
            return status.to_string();
        }
        let color = match status {
            SessionStatus::Running => "36",
            SessionStatus::Completed => "32",
            SessionStatus::Stopped => "33",
            SessionStatus::Failed => "31",
        };
        format!("\x1b[{color}m{status}\x1b[0m")
    }

    /// Format the final state of a session
    pub fn format_status(&self, snapshot: &StatusSnapshot) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(snapshot).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(snapshot).unwrap_or_default(),
            OutputFormat::Summary => format!(
                "Session {} {} in {}ms: {}",
                snapshot.session_id,
                snapshot.status,
                snapshot.elapsed_ms(),
                self.format_results(&snapshot.results)
            ),
            OutputFormat::Table | OutputFormat::Csv => {
                let mut output = format!(
                    "\nSession {} {} after {}ms\n",
                    snapshot.session_id,
                    self.session_label(snapshot.status),
                    snapshot.elapsed_ms()
                );
                output.push_str(&self.format_results(&snapshot.results));
                output
            }
        }
    }

    /// Format an analytics snapshot
    pub fn format_analytics(&self, analytics: &AnalyticsSnapshot) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(analytics).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(analytics).unwrap_or_default(),
            OutputFormat::Summary => {
                let s = &analytics.summary;
                format!(
                    "{} results, {:.1}% success, avg {:.1}ms",
                    s.total_tests, s.success_rate, s.average_duration
                )
            }
            OutputFormat::Table | OutputFormat::Csv => self.format_analytics_table(analytics),
        }
    }

    fn format_analytics_table(&self, analytics: &AnalyticsSnapshot) -> String {
        let s = &analytics.summary;
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(" Analytics ({})\n", analytics.range));
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Total: {} | Passed: {} | Failed: {} | Skipped: {} | Errors: {}\n",
            s.total_tests, s.passed, s.failed, s.skipped, s.errors
        ));
        output.push_str(&format!(
            " Success Rate: {} | Avg Duration: {:.1}ms\n",
            self.rate_label(s.success_rate),
            s.average_duration
        ));

        if !analytics.trends.is_empty() {
            output.push_str("\n Daily Trends:\n");
            output.push_str(" ───────────────────────────────────────────────────────────\n");
            for day in &analytics.trends {
                let bar_len = ((day.success_rate / 5.0) as usize).min(20);
                output.push_str(&format!(
                    " {} {}{} {}\n",
                    day.date,
                    "█".repeat(bar_len),
                    "░".repeat(20 - bar_len),
                    self.rate_label(day.success_rate)
                ));
            }
        }

        if !analytics.top_failures.is_empty() {
            output.push_str("\n Top Failures:\n");
            for failure in &analytics.top_failures {
                output.push_str(&format!(
                    "   - {} ({}) x{}, last {}\n",
                    failure.test_name,
                    failure.test_id,
                    failure.count,
                    failure.last_failure.format("%Y-%m-%d %H:%M:%S")
                ));
            }
        }

        if !analytics.performance.slowest.is_empty() {
            output.push_str("\n Slowest Tests:\n");
            for perf in &analytics.performance.slowest {
                output.push_str(&format!(
                    "   - {:32} avg {:8.1}ms  max {:6}ms  ({} runs)\n",
                    truncate(&perf.test_name, 32),
                    perf.average_duration,
                    perf.max_duration,
                    perf.runs
                ));
            }
        }

        output
    }

    fn rate_label(&self, rate: f64) -> String {
        let text = format!("{rate:5.1}%");
        if !self.colorize {
            return text;
        }
        if rate >= 90.0 {
            format!("\x1b[32m{text}\x1b[0m")
        } else if rate >= 50.0 {
            format!("\x1b[33m{text}\x1b[0m")
        } else {
            format!("\x1b[31m{text}\x1b[0m")
        }
    }

    /// Format registered suites, with health when available
    pub fn format_suites(
        &self,
        suites: &[SuiteMetadata],
        health: &[(String, HealthStatus)],
        detailed: bool,
    ) -> String {
        if matches!(self.format, OutputFormat::Json | OutputFormat::JsonPretty) {
            return if self.format == OutputFormat::JsonPretty {
                serde_json::to_string_pretty(suites).unwrap_or_default()
            } else {
                serde_json::to_string(suites).unwrap_or_default()
            };
        }

        let mut output = format!("\nRegistered Test Suites ({} total)\n", suites.len());
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

        for suite in suites {
            let state = health
                .iter()
                .find(|(id, _)| *id == suite.id)
                .map(|(_, h)| self.health_label(h))
                .unwrap_or_default();
            output.push_str(&format!("  {:20} {:28} {}\n", suite.id, suite.name, state));

            if detailed {
                if !suite.description.is_empty() {
                    output.push_str(&format!("      {}\n", suite.description));
                }
                output.push_str(&format!(
                    "      estimated {}ms",
                    suite.estimated_duration_ms
                ));
                if !suite.dependencies.is_empty() {
                    output.push_str(&format!(", depends on {}", suite.dependencies.join(", ")));
                }
                output.push('\n');
            }
        }

        output
    }

    fn health_label(&self, health: &HealthStatus) -> String {
        let (symbol, color) = match health.status {
            HealthState::Healthy => ("✓ healthy", "32"),
            HealthState::Degraded => ("⚠ degraded", "33"),
            HealthState::Unhealthy => ("✗ unhealthy", "31"),
        };
        if self.colorize {
            format!("\x1b[{color}m{symbol}\x1b[0m")
        } else {
            symbol.to_string()
        }
    }

    /// Format execution logs, one per line
    pub fn format_logs(&self, logs: &[ExecutionLog]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(logs).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(logs).unwrap_or_default(),
            _ => logs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Render results as CSV with a header row
fn results_csv(results: &[TestResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer
            .serialize(CsvRow {
                id: &result.id,
                name: &result.name,
                status: result.status.as_str(),
                duration_ms: result.duration,
                timestamp: result.timestamp.to_rfc3339(),
                message: result.message.as_deref().unwrap_or(""),
            })
            .context("Failed to write CSV row")?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Write rendered output to a file
pub fn write_to_file(path: &str, content: &str) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {path}"))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

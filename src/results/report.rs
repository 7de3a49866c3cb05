//! Report generation for session results
//!
//! Render a session's results and summary in various output formats.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::models::{TestResult, TestStatus};
use crate::results::analytics::{calculate_summary, TestSummary};

/// Report generator
pub struct ReportGenerator;

impl ReportGenerator {
    /// Render a session report
    pub fn session_report(session_id: &str, results: &[TestResult], format: ReportFormat) -> String {
        let refs: Vec<&TestResult> = results.iter().collect();
        let summary = calculate_summary(&refs);

        match format {
            ReportFormat::Json => Self::format_json_report(session_id, results, &summary),
            ReportFormat::Html => Self::format_html_report(session_id, results, &summary),
            ReportFormat::Text => Self::format_text_digest(session_id, &summary),
            ReportFormat::Markdown => Self::format_markdown_report(session_id, results, &summary),
        }
    }

    fn format_json_report(session_id: &str, results: &[TestResult], summary: &TestSummary) -> String {
        let abbreviated: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "name": r.name,
                    "status": r.status,
                    "duration": r.duration,
                })
            })
            .collect();

        let report = json!({
            "session_id": session_id,
            "generated_at": Utc::now(),
            "summary": summary,
            "results": results,
            "abbreviated_results": abbreviated,
        });

        serde_json::to_string_pretty(&report).unwrap_or_default()
    }

    /// One-line digest; stands in for richer renderers
    fn format_text_digest(session_id: &str, summary: &TestSummary) -> String {
        format!(
            "Test Report {}: {} tests, {} passed, {} failed, {} errors, {} skipped ({:.1}% success, avg {:.0}ms)",
            session_id,
            summary.total_tests,
            summary.passed,
            summary.failed,
            summary.errors,
            summary.skipped,
            summary.success_rate,
            summary.average_duration
        )
    }

    fn format_markdown_report(session_id: &str, results: &[TestResult], summary: &TestSummary) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "# Test Execution Report\n");
        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Session | `{session_id}` |");
        let _ = writeln!(output, "| Generated | {} |", format_datetime(&Utc::now()));
        let _ = writeln!(output, "| Total Tests | {} |", summary.total_tests);
        let _ = writeln!(output, "| Passed | {} |", summary.passed);
        let _ = writeln!(output, "| Failed | {} |", summary.failed);
        let _ = writeln!(output, "| Errors | {} |", summary.errors);
        let _ = writeln!(output, "| Skipped | {} |", summary.skipped);
        let _ = writeln!(output, "| Success Rate | {:.1}% |", summary.success_rate);
        let _ = writeln!(output, "| Average Duration | {:.0}ms |", summary.average_duration);

        let _ = writeln!(output, "\n## Results\n");
        let _ = writeln!(output, "| Test | Status | Duration | Message |");
        let _ = writeln!(output, "|------|--------|----------|---------|");
        for result in results {
            let _ = writeln!(
                output,
                "| {} | {} {} | {}ms | {} |",
                result.name,
                result.status.symbol(),
                result.status,
                result.duration,
                result.message.as_deref().unwrap_or("")
            );
        }

        output
    }

    fn format_html_report(session_id: &str, results: &[TestResult], summary: &TestSummary) -> String {
        let mut output = String::new();

        let _ = writeln!(output, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Test Execution Report - {}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        h2 {{ color: #555; margin-top: 30px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }}
        th {{ background: #007bff; color: white; }}
        tr:hover {{ background: #f8f9fa; }}
        .passed {{ color: #28a745; font-weight: bold; }}
        .failed {{ color: #dc3545; font-weight: bold; }}
        .error {{ color: #fd7e14; font-weight: bold; }}
        .skipped {{ color: #6c757d; font-weight: bold; }}
        .stat-card {{ display: inline-block; background: #f8f9fa; padding: 20px; margin: 10px; border-radius: 8px; min-width: 150px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; color: #007bff; }}
        .stat-label {{ color: #666; font-size: 14px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Test Execution Report</h1>
        <p>Session <code>{}</code> &middot; generated {}</p>

        <h2>Summary</h2>"#,
            escape_html(session_id),
            escape_html(session_id),
            format_datetime(&Utc::now())
        );

        for (value, label) in [
            (summary.total_tests.to_string(), "Total Tests"),
            (summary.passed.to_string(), "Passed"),
            (summary.failed.to_string(), "Failed"),
            (summary.errors.to_string(), "Errors"),
            (format!("{:.1}%", summary.success_rate), "Success Rate"),
            (format!("{:.0}ms", summary.average_duration), "Avg Duration"),
        ] {
            let _ = writeln!(
                output,
                r#"        <div class="stat-card">
            <div class="stat-value">{value}</div>
            <div class="stat-label">{label}</div>
        </div>"#
            );
        }

        let _ = writeln!(
            output,
            r#"
        <h2>Test Results</h2>
        <table>
            <tr>
                <th>Test</th>
                <th>Status</th>
                <th>Duration</th>
                <th>Message</th>
                <th>Timestamp</th>
            </tr>"#
        );

        for result in results {
            let _ = writeln!(
                output,
                r#"            <tr>
                <td>{} <small>({})</small></td>
                <td class="{}">{}</td>
                <td>{}ms</td>
                <td>{}</td>
                <td>{}</td>
            </tr>"#,
                escape_html(&result.name),
                escape_html(&result.id),
                status_class(result.status),
                result.status,
                result.duration,
                escape_html(result.message.as_deref().unwrap_or("")),
                format_datetime(&result.timestamp)
            );
        }

        let _ = writeln!(
            output,
            r#"        </table>
    </div>
</body>
</html>"#
        );

        output
    }
}

/// Report output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Html,
    Text,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ReportFormat::Json),
            "html" | "htm" => Some(ReportFormat::Html),
            "text" | "txt" => Some(ReportFormat::Text),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
        }
    }
}

fn status_class(status: TestStatus) -> &'static str {
    status.as_str()
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

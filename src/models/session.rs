//! Execution session models
//!
//! A session is one run across a chosen set of suites with its own status,
//! progress and results.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TestResult;

/// Session lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Suites to run plus session-level execution settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub test_suites: Vec<String>,

    /// Session timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub retry_attempts: Option<u32>,
}

impl ExecutionConfig {
    pub fn new<I, S>(suites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            test_suites: suites.into_iter().map(Into::into).collect(),
            timeout_ms: None,
            retry_attempts: None,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }
}

/// Per-call overrides of the session configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub retry_attempts: Option<u32>,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
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
}

/// Session progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
            percentage: 0,
        }
    }

    /// Record one more finished suite, saturating at `total`
    pub fn advance(&mut self) {
        self.completed = (self.completed + 1).min(self.total);
        self.percentage = percentage_of(self.completed, self.total);
    }

    /// Jump straight to the finished state
    pub fn finish(&mut self) {
        self.completed = self.total;
        self.percentage = 100;
    }
}

fn percentage_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Live session state, owned by the execution engine
#[derive(Clone, Debug)]
pub struct ExecutionSession {
    pub session_id: String,
    pub config: ExecutionConfig,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub results: Vec<TestResult>,
    pub current_suite: Option<String>,
    pub progress: Progress,
}

impl ExecutionSession {
    pub fn new(session_id: impl Into<String>, config: ExecutionConfig) -> Self {
        let total = config.test_suites.len();
        Self {
            session_id: session_id.into(),
            config,
            status: SessionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            results: Vec::new(),
            current_suite: None,
            progress: Progress::new(total),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Move to a terminal status. Returns false when the session already left
    /// `running`, in which case nothing changes.
    pub fn finalize(&mut self, status: SessionStatus) -> bool {
        if !self.is_running() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.end_time = Some(Utc::now());
        self.current_suite = None;
        if status == SessionStatus::Completed {
            self.progress.finish();
        }
        true
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            session_id: self.session_id.clone(),
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            progress: self.progress,
            current_suite: self.current_suite.clone(),
            results: self.results.clone(),
        }
    }
}

/// Read-only projection of a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub progress: Progress,
    pub current_suite: Option<String>,
    pub results: Vec<TestResult>,
}

impl StatusSnapshot {
    /// Wall-clock duration, up to now for running sessions
    pub fn elapsed_ms(&self) -> u64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds().max(0) as u64
    }
}

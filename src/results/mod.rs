//! Results storage, analytics and reporting
//!
//! Provides the shared results store, derived analytics and report generation
//! for execution sessions.

#![allow(dead_code)]

pub mod analytics;
mod report;
mod storage;

pub use analytics::{AnalyticsSnapshot, TimeRange};
pub use report::{ReportFormat, ReportGenerator};
pub use storage::ResultsStore;

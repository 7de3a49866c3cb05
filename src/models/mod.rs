//! Data models for suite orchestration
//!
//! This module contains the data structures shared by the engine, the results
//! store and the command-line front end.

mod log;
mod session;
mod test_result;

pub use log::{ExecutionLog, LogLevel};
pub use session::{
    ExecutionConfig, ExecutionOptions, ExecutionSession, SessionStatus, StatusSnapshot,
};
pub use test_result::{TestResult, TestStatus};

//! Orchestrator error taxonomy
//!
//! Suite-level failures never surface through these errors: the engine turns
//! them into error results. These are the errors callers of the engine and the
//! results store can observe, plus the messages used for synthetic results.

use thiserror::Error;

/// Errors raised by the orchestrator API
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Execution session not found: {0}")]
    NotFound(String),

    #[error("Execution timeout after {0}ms")]
    Timeout(u64),

    #[error("Test suite {suite} failed after {attempts} attempt(s): {message}")]
    SuiteExecution {
        suite: String,
        attempts: u32,
        message: String,
    },

    #[error("Test suite not found: {0}")]
    Configuration(String),

    #[error("Invalid results payload: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;

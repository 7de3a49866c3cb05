//! Test execution engine
//!
//! Session management with sequential and parallel suite execution.

#![allow(dead_code)]

mod engine;
mod parallel;
mod runner;

pub use engine::{EngineSettings, ExecutionEngine};

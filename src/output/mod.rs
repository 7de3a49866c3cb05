//! Output formatting module
//!
//! Terminal rendering of results, session status and analytics.

mod formatter;

pub use formatter::{write_to_file, OutputFormat, ResultFormatter};

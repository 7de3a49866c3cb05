//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Test suite orchestrator for the taxi booking backend
#[derive(Parser, Debug)]
#[command(name = "suite-orchestrator")]
#[command(version = "0.1.0")]
#[command(about = "Run test suites in sessions and analyze their results")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run test suites in a new session
    Run(RunArgs),

    /// List registered test suites
    List(ListArgs),

    /// Inspect an exported results archive
    Results(ResultsArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file (defaults to the standard locations)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Run profile from the configuration file
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Suite id to run; repeat for several (overrides the profile)
    #[arg(short, long = "suite")]
    pub suites: Vec<String>,

    /// Run suites concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Session timeout in milliseconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Setup/run/teardown cycles per suite
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Report format (json, html, text, markdown)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Export results and logs of the session to a JSON archive
    #[arg(long)]
    pub export: Option<String>,

    /// Print analytics after the run
    #[arg(long)]
    pub analytics: bool,

    /// Progress polling interval in milliseconds
    #[arg(long, default_value = "250")]
    pub poll_ms: u64,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Configuration file (defaults to the standard locations)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Show descriptions, durations and dependencies
    #[arg(short, long)]
    pub detailed: bool,

    /// Run each suite's health check
    #[arg(long)]
    pub health: bool,

    /// Show run profiles
    #[arg(short, long)]
    pub profiles: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Archive produced by `run --export`
    #[arg(short, long)]
    pub import: String,

    /// Session to show (lists sessions when omitted)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Render a session report instead (json, html, text, markdown)
    #[arg(short, long)]
    pub report: Option<String>,

    /// Show analytics across the archive
    #[arg(short, long)]
    pub analytics: bool,

    /// Limit analytics to results of the last N days
    #[arg(long)]
    pub days: Option<i64>,

    /// Show session logs of one level (debug, info, warn, error)
    #[arg(short, long)]
    pub logs: Option<String>,

    /// Drop sessions older than the configured max age before display
    #[arg(long)]
    pub prune: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Destination path
        #[arg(default_value = "suite-orchestrator.yaml")]
        path: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Configuration file (defaults to the standard locations)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        path: String,
    },

    /// Describe environment variable overrides
    Env,
}

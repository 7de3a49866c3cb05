//! Suite Orchestrator - test orchestration and results engine
//!
//! Runs the test suites of a taxi booking backend inside execution sessions,
//! sequentially or in parallel, with per-session timeouts and per-suite
//! retries, then stores the results and derives reports and analytics.
//!
//! ## Usage
//!
//! ```bash
//! # Write an example configuration with scripted suites
//! suite-orchestrator config init
//!
//! # Run a profile from the configuration
//! suite-orchestrator run --profile full --analytics
//!
//! # Run selected suites with a markdown report
//! suite-orchestrator run -s authentication -s booking --format markdown
//!
//! # Inspect an exported archive
//! suite-orchestrator results --import results.json --analytics
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cli;
mod config;
mod error;
mod executor;
mod models;
mod output;
mod results;
mod suite;
mod utils;

use cli::Args;
use config::{AppConfig, ConfigFile, EnvConfig};
use executor::{EngineSettings, ExecutionEngine};
use models::{ExecutionConfig, ExecutionOptions, LogLevel, SessionStatus};
use output::{write_to_file, OutputFormat, ResultFormatter};
use results::{ReportFormat, ReportGenerator, ResultsStore, TimeRange};
use suite::{ScriptedSuite, SuiteRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    match args.command {
        cli::Command::Run(run_args) => {
            let config = load_config(run_args.config.as_deref(), &env)?;
            init_logging(args.verbose, &config.app);
            run_session(run_args, config, &env).await?;
        }
        cli::Command::List(list_args) => {
            let config = load_config(list_args.config.as_deref(), &env)?;
            init_logging(args.verbose, &config.app);
            list_suites(list_args, config).await?;
        }
        cli::Command::Results(results_args) => {
            let config = load_config(None, &env)?;
            init_logging(args.verbose, &config.app);
            show_results(results_args, &config.app).await?;
        }
        cli::Command::Config(config_args) => {
            init_logging(args.verbose, &AppConfig::default());
            manage_config(config_args, &env)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, app: &AppConfig) {
    let level = if verbose {
        utils::LogLevel::Debug
    } else {
        utils::LogLevel::from_str(&app.log_level).unwrap_or(utils::LogLevel::Info)
    };
    utils::init_logger(level);
}

/// Explicit path, then `SUITE_ORCH_CONFIG`, then the standard locations
fn load_config(path: Option<&str>, env: &EnvConfig) -> Result<ConfigFile> {
    let mut config = match path.or(env.config_file.as_deref()) {
        Some(path) => ConfigFile::load(config::file::expand_path(path))?,
        None => ConfigFile::load_default()?,
    };
    config.app.apply_env(env);
    Ok(config)
}

async fn build_engine(config: &ConfigFile) -> Result<ExecutionEngine> {
    if config.suites.is_empty() {
        bail!("No test suites configured. Create a configuration with: suite-orchestrator config init");
    }

    let registry = Arc::new(SuiteRegistry::new());
    for spec in &config.suites {
        registry.register(Arc::new(ScriptedSuite::new(spec.clone()))).await;
    }

    let store = Arc::new(ResultsStore::with_log_capacity(config.app.max_logs_per_session));
    Ok(ExecutionEngine::with_settings(
        registry,
        store,
        EngineSettings::from(&config.app),
    ))
}

async fn run_session(args: cli::RunArgs, config: ConfigFile, env: &EnvConfig) -> Result<()> {
    let format_name = args.format.clone().unwrap_or_else(|| env.format_or("text"));
    let report_format = ReportFormat::from_str(&format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown report format: {format_name}"))?;

    let (exec_config, mut options) = if !args.suites.is_empty() {
        (ExecutionConfig::new(args.suites.iter().cloned()), ExecutionOptions::new())
    } else if let Some(name) = &args.profile {
        config
            .profile(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown profile: {name}"))?
            .to_execution()
    } else {
        (
            ExecutionConfig::new(config.suites.iter().map(|s| s.id.clone())),
            ExecutionOptions::new(),
        )
    };

    options.parallel |= args.parallel || env.parallel.unwrap_or(false);
    options.timeout_ms = args.timeout;
    options.retry_attempts = args.retries;

    let engine = build_engine(&config).await?;
    let session_id = engine.start_execution(exec_config, options).await;
    info!("Session {} started", session_id);

    let formatter = ResultFormatter::new(OutputFormat::Table);
    let snapshot = watch_session(&engine, &session_id, &formatter, args.poll_ms).await?;
    eprintln!(
        "{}",
        ResultFormatter::new(OutputFormat::Summary).format_status(&snapshot)
    );

    let report = engine
        .store()
        .generate_report(&session_id, report_format)
        .await
        .unwrap_or_else(|| ReportGenerator::session_report(&session_id, &snapshot.results, report_format));

    match &args.output {
        Some(path) => {
            write_to_file(path, &report)?;
            println!("Report saved to: {path}");
        }
        None => println!("{report}"),
    }

    if let Some(path) = &args.export {
        let archive = engine
            .store()
            .export_results(Some(std::slice::from_ref(&session_id)))
            .await?;
        write_to_file(path, &archive)?;
        println!("Results exported to: {path}");
    }

    if args.analytics {
        let analytics = engine.store().get_analytics(None).await;
        println!("{}", formatter.format_analytics(&analytics));
    }

    match snapshot.status {
        SessionStatus::Completed => Ok(()),
        status => bail!("Session {session_id} {status}"),
    }
}

/// Print progress until the session ends; Ctrl-C stops it
async fn watch_session(
    engine: &ExecutionEngine,
    session_id: &str,
    formatter: &ResultFormatter,
    poll_ms: u64,
) -> Result<models::StatusSnapshot> {
    let poll = Duration::from_millis(poll_ms.max(10));
    let mut last_line = String::new();

    loop {
        let snapshot = engine
            .get_execution_status(session_id)
            .await
            .with_context(|| format!("Session {session_id} disappeared"))?;

        let line = formatter.format_progress(&snapshot);
        if line != last_line {
            eprintln!("{line}");
            last_line = line;
        }
        if snapshot.status.is_terminal() {
            return Ok(snapshot);
        }

        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping session {}", session_id);
                engine.stop_execution(session_id).await?;
            }
        }
    }
}

async fn list_suites(args: cli::ListArgs, config: ConfigFile) -> Result<()> {
    let engine = build_engine(&config).await?;
    let formatter = ResultFormatter::new(OutputFormat::Table);

    let suites = engine.get_available_test_suites().await;
    let health = if args.health {
        engine.get_suite_health().await
    } else {
        Vec::new()
    };
    println!("{}", formatter.format_suites(&suites, &health, args.detailed));

    if args.health {
        let status = engine.get_health_status().await;
        println!("Orchestrator: {:?} - {}\n", status.status, status.message);
    }

    if args.profiles {
        println!("Run Profiles:\n");
        for profile in &config.profiles {
            println!(
                "  - {:12} {:40} [{}]{}",
                profile.name,
                profile.suites.join(", "),
                if profile.parallel { "parallel" } else { "sequential" },
                if profile.description.is_empty() {
                    String::new()
                } else {
                    format!(" {}", profile.description)
                }
            );
        }
        println!();
    }

    Ok(())
}

async fn show_results(args: cli::ResultsArgs, app: &AppConfig) -> Result<()> {
    let payload = std::fs::read_to_string(&args.import)
        .with_context(|| format!("Failed to read archive: {}", args.import))?;

    let store = ResultsStore::with_log_capacity(app.max_logs_per_session);
    let imported = store.import_results(&payload).await?;
    info!("Imported {} sessions from {}", imported, args.import);

    if args.prune {
        let stats = store.cleanup(app.session_max_age()).await;
        println!(
            "Pruned {} result sets and {} log sets older than {}s",
            stats.results_removed, stats.logs_removed, app.session_max_age_secs
        );
    }

    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;
    let formatter = ResultFormatter::new(format);

    match &args.session {
        Some(session_id) => {
            let results = store
                .get_results(session_id)
                .await
                .ok_or_else(|| anyhow::anyhow!("No results for session {session_id}"))?;

            match &args.report {
                Some(name) => {
                    let report_format = ReportFormat::from_str(name)
                        .ok_or_else(|| anyhow::anyhow!("Unknown report format: {name}"))?;
                    println!("{}", ReportGenerator::session_report(session_id, &results, report_format));
                }
                None => println!("{}", formatter.format_results(&results)),
            }

            if let Some(level) = &args.logs {
                let level = LogLevel::from_str(level)
                    .ok_or_else(|| anyhow::anyhow!("Unknown log level: {level}"))?;
                let logs = store.get_execution_logs(session_id, Some(level)).await;
                println!("{}", formatter.format_logs(&logs));
            }
        }
        None => {
            let mut sessions = store.session_ids().await;
            sessions.sort();

            if sessions.is_empty() {
                println!("\n📭 No sessions in archive.");
            } else {
                println!("\nSessions in {}:", args.import);
                for session_id in &sessions {
                    let results = store.get_results(session_id).await.unwrap_or_default();
                    println!(
                        "  {:40} {}",
                        session_id,
                        ResultFormatter::new(OutputFormat::Summary).format_results(&results)
                    );
                }
                println!("\nUse --session <id> to view a session.");
            }
        }
    }

    if args.analytics {
        let range = args
            .days
            .map(|days| {
                chrono::Duration::try_days(days)
                    .map(TimeRange::last)
                    .ok_or_else(|| anyhow::anyhow!("--days out of range: {days}"))
            })
            .transpose()?;
        let analytics = store.get_analytics(range).await;
        println!("{}", formatter.format_analytics(&analytics));
    }

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { path, force } => {
            let path = config::file::expand_path(&path);
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            ConfigFile::example().save(&path)?;
            println!("Example configuration written to {}", path.display());
        }

        cli::ConfigAction::Show { config } => {
            let loaded = load_config(config.as_deref(), env)?;
            let rendered =
                serde_yaml::to_string(&loaded).context("Failed to serialize config")?;
            println!("{rendered}");
        }

        cli::ConfigAction::Validate { path } => {
            let loaded = ConfigFile::load(config::file::expand_path(&path))?;
            println!(
                "✓ {} is valid ({} suites, {} profiles)",
                path,
                loaded.suites.len(),
                loaded.profiles.len()
            );
        }

        cli::ConfigAction::Env => {
            config::env::print_env_help();
            println!();
            env.print_summary();
        }
    }

    Ok(())
}

//! Reposync: recursively sync a tree of git repositories against their
//! remotes.
//!
//! This is the main entry point for the `reposync` CLI. It parses
//! arguments, resolves the effective configuration, runs the sync pass,
//! and reports the outcome with proper exit codes.

mod cli;
mod config;
mod error;
mod exit_codes;
mod git;
mod model;
mod orchestrator;
mod output;
mod repo;
mod reporter;
mod scanner;
mod strategy;
mod sync;
#[cfg(test)]
mod test_support;

use crate::cli::Cli;
use crate::config::FileConfig;
use crate::error::{Result, SyncError};
use crate::model::SyncReport;
use crate::orchestrator::SyncOrchestrator;
use crate::output::{ConsoleOutputHandler, NullOutputHandler, OutputHandler};
use crate::reporter::SummaryReporter;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let search_dir = cli.directory.clone().unwrap_or_else(|| PathBuf::from("."));
    let search_dir = search_dir.canonicalize().map_err(|e| {
        SyncError::UserError(format!(
            "invalid directory '{}': {}",
            search_dir.display(),
            e
        ))
    })?;
    if !search_dir.is_dir() {
        return Err(SyncError::UserError(format!(
            "'{}' is not a directory",
            search_dir.display()
        )));
    }

    let file_config = FileConfig::discover(&search_dir, cli.config.as_deref())?;
    let config = cli.to_sync_config(&file_config);

    let mut logger = env_logger::Builder::new();
    logger.filter_level(if config.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
    logger.parse_default_env();
    logger.init();

    git::ensure_git_available()?;
    // Surface invalid branch globs before touching any repository.
    sync::build_branch_filter(&config.branch_patterns)?;

    let output: Box<dyn OutputHandler> = if config.json_output {
        Box::new(NullOutputHandler)
    } else {
        Box::new(ConsoleOutputHandler::new(config.verbose))
    };

    let orchestrator = SyncOrchestrator::new(config.clone(), output.as_ref());
    let result = orchestrator.sync_all(&search_dir);

    if config.json_output {
        let report = SyncReport::from(&result);
        let json = serde_json::to_string_pretty(&report).map_err(|e| {
            SyncError::UserError(format!("failed to serialize result: {}", e))
        })?;
        println!("{}", json);
    } else {
        SummaryReporter::new(output.as_ref()).print_summary(&result, &config);
    }

    Ok(if result.has_critical_issues() {
        exit_codes::CRITICAL_ISSUES
    } else {
        exit_codes::SUCCESS
    })
}

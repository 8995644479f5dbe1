//! CLI argument parsing for reposync.
//!
//! Uses clap derive macros for declarative argument definitions. Flags map
//! onto `SyncConfig`; a flag that is not given defers to the config file,
//! which defers to the built-in default.

use crate::config::{FileConfig, SyncConfig};
use clap::Parser;
use std::path::PathBuf;

/// Recursively sync git repositories under a directory.
///
/// By default this is a dry run: every repository is fetched and analyzed,
/// intended actions are reported, and nothing is mutated. Pass `--execute`
/// to apply the changes.
#[derive(Parser, Debug)]
#[command(name = "reposync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to search for repositories (default: current directory).
    pub directory: Option<PathBuf>,

    /// Actually execute changes (default: dry-run).
    #[arg(long)]
    pub execute: bool,

    /// Use merge instead of rebase when pulling.
    #[arg(long)]
    pub no_rebase: bool,

    /// Keep local branches whose upstream was deleted.
    #[arg(long)]
    pub no_remove_stale: bool,

    /// Auto-stash local changes around pulls.
    #[arg(long)]
    pub stash_and_pull: bool,

    /// Sync repositories in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Max parallel workers (default: min(cpu count, 8)).
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Exclude repositories whose path contains this substring
    /// (can be given multiple times).
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Verbose output.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Remote name to sync from (default: origin).
    #[arg(long)]
    pub remote: Option<String>,

    /// Comma-separated branch glob patterns to sync
    /// (e.g. "main,develop,release/*").
    #[arg(long)]
    pub branches: Option<String>,

    /// Output results as JSON (suppresses normal output).
    #[arg(long)]
    pub json: bool,

    /// Do not create local branches for remote-only branches.
    #[arg(long)]
    pub no_create_branches: bool,

    /// Only create branches with commits newer than N days (0 = no limit).
    #[arg(long)]
    pub max_branch_age: Option<u32>,

    /// Number of retries for failed fetches.
    #[arg(long)]
    pub fetch_retries: Option<u32>,

    /// Path to a config file (default: .reposync.yaml in the search dir
    /// or home directory).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Resolve the effective configuration: explicit CLI flags win, then
    /// the config file, then built-in defaults.
    pub fn to_sync_config(&self, file: &FileConfig) -> SyncConfig {
        let defaults = SyncConfig::default();

        let branch_patterns = match &self.branches {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            None => file
                .branch_patterns
                .clone()
                .unwrap_or(defaults.branch_patterns),
        };

        let exclude_patterns = if self.exclude.is_empty() {
            file.exclude_patterns
                .clone()
                .unwrap_or(defaults.exclude_patterns)
        } else {
            self.exclude.clone()
        };

        // Presence-only boolean flags: a given flag asserts its value,
        // an absent one defers to the file.
        let flag = |given: bool, from_file: Option<bool>, default: bool| {
            if given {
                !default
            } else {
                from_file.unwrap_or(default)
            }
        };

        SyncConfig {
            dry_run: !flag(self.execute, file.execute, false),
            use_rebase: flag(self.no_rebase, file.use_rebase, true),
            remove_stale: flag(self.no_remove_stale, file.remove_stale, true),
            stash_and_pull: flag(self.stash_and_pull, file.stash_and_pull, false),
            parallel: flag(self.parallel, file.parallel, false),
            max_workers: self
                .max_workers
                .or(file.max_workers)
                .unwrap_or(defaults.max_workers)
                .max(1),
            verbose: flag(self.verbose, file.verbose, false),
            exclude_patterns,
            remote_name: self
                .remote
                .clone()
                .or_else(|| file.remote_name.clone())
                .unwrap_or(defaults.remote_name),
            branch_patterns,
            json_output: flag(self.json, file.json_output, false),
            fetch_retries: self
                .fetch_retries
                .or(file.fetch_retries)
                .unwrap_or(defaults.fetch_retries),
            create_branches: flag(self.no_create_branches, file.create_branches, true),
            max_branch_age_days: self
                .max_branch_age
                .or(file.max_branch_age_days)
                .unwrap_or(defaults.max_branch_age_days),
        }
    }
}

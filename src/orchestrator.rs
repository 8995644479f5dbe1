//! Cross-repository orchestration.
//!
//! Discovers repositories and runs the per-repository synchronizer over
//! them, sequentially or on a fixed-size worker pool. Every failure mode of
//! a single repository (invalid root, git errors, even a panic) is
//! converted into a FAILED issue; one broken repository never prevents the
//! others from syncing.

use crate::config::SyncConfig;
use crate::model::{IssueType, SyncIssue, SyncResult};
use crate::output::{BufferedOutputHandler, OutputHandler};
use crate::repo::GitCliRepository;
use crate::scanner::RepositoryScanner;
use crate::sync::BranchSynchronizer;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Coordinates a sync pass across all repositories under a search root.
pub struct SyncOrchestrator<'a> {
    config: SyncConfig,
    output: &'a dyn OutputHandler,
    scanner: RepositoryScanner,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(config: SyncConfig, output: &'a dyn OutputHandler) -> Self {
        let scanner = RepositoryScanner::new(config.exclude_patterns.clone());
        Self {
            config,
            output,
            scanner,
        }
    }

    /// Discover repositories under `search_dir` and sync them all.
    pub fn sync_all(&self, search_dir: &Path) -> SyncResult {
        let repos: Vec<PathBuf> = self.scanner.find_repositories(search_dir).collect();

        if repos.is_empty() {
            self.output.warning(
                &format!("No git repositories found in {}", search_dir.display()),
                0,
            );
            return SyncResult::new();
        }

        self.output
            .info(&format!("Found {} repositories", repos.len()), 0);

        if self.config.parallel {
            self.sync_parallel(&repos)
        } else {
            self.sync_sequential(&repos)
        }
    }

    fn sync_sequential(&self, repos: &[PathBuf]) -> SyncResult {
        let mut combined = SyncResult::new();
        for repo_path in repos {
            let result = self.sync_single_repo(repo_path, self.output);
            combined.merge(result);
        }
        combined
    }

    /// Fan the repositories out over a fixed-size worker pool.
    ///
    /// Workers pull the next repository off a shared counter, narrate into
    /// a private buffer, and take the one mutex only to flush that buffer
    /// and merge their result, never across repository I/O.
    fn sync_parallel(&self, repos: &[PathBuf]) -> SyncResult {
        let combined = Mutex::new(SyncResult::new());
        let next_index = AtomicUsize::new(0);
        let workers = self.config.max_workers.max(1).min(repos.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = next_index.fetch_add(1, Ordering::SeqCst);
                        if index >= repos.len() {
                            break;
                        }
                        let buffer = BufferedOutputHandler::new();
                        let result = self.sync_single_repo(&repos[index], &buffer);

                        let mut guard = combined
                            .lock()
                            .unwrap_or_else(|poison| poison.into_inner());
                        buffer.flush_to(self.output);
                        guard.merge(result);
                    }
                });
            }
        });

        combined
            .into_inner()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Sync one repository, converting every failure into issue data.
    fn sync_single_repo(&self, repo_path: &Path, output: &dyn OutputHandler) -> SyncResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            output.section(&format!("Processing: {}", repo_path.display()));

            let repo = match GitCliRepository::open(repo_path) {
                Ok(repo) => repo,
                Err(e) => {
                    output.error(&format!("Not a valid git repository: {}", e), 0);
                    let mut result = SyncResult::new();
                    result.add_issue(SyncIssue::new(
                        repo_path.display().to_string(),
                        "",
                        IssueType::Failed,
                        "Invalid git repository",
                    ));
                    return result;
                }
            };

            match BranchSynchronizer::new(&repo, output, &self.config) {
                Ok(synchronizer) => synchronizer.sync(),
                Err(e) => {
                    let mut result = SyncResult::new();
                    result.add_issue(SyncIssue::new(
                        repo_path.display().to_string(),
                        "",
                        IssueType::Failed,
                        e.to_string(),
                    ));
                    result
                }
            }
        }));

        match outcome {
            Ok(result) => result,
            Err(_) => {
                let mut result = SyncResult::new();
                result.add_issue(SyncIssue::new(
                    repo_path.display().to_string(),
                    "",
                    IssueType::Failed,
                    "Unexpected error during sync",
                ));
                result
            }
        }
    }
}

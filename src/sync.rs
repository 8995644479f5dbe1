//! Per-repository branch synchronization.
//!
//! One `BranchSynchronizer` reconciles a single repository against its
//! remote: fetch with retry, stale-branch handling, per-branch strategy
//! dispatch, new-branch creation, and restoration of the originally
//! checked-out branch, optionally wrapped in a whole-tree stash.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::model::{BranchInfo, IssueType, OperationResult, OperationType, SyncIssue, SyncResult};
use crate::output::OutputHandler;
use crate::repo::GitRepository;
use crate::strategy::{self, StrategyContext};
use chrono::{Duration, Local, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;

/// Compile branch glob patterns into a matcher.
///
/// An empty pattern list means "no filter" and is represented as None.
/// Invalid patterns are a user error, surfaced before any pass starts.
pub fn build_branch_filter(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            SyncError::UserError(format!("invalid branch pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| SyncError::UserError(format!("failed to compile branch patterns: {}", e)))
}

/// Outcome of trying to create a local branch for a remote-only branch.
enum CreateOutcome {
    Created,
    SkippedByAge,
    Failed,
}

/// Synchronizes a single repository's branches against one remote.
pub struct BranchSynchronizer<'a> {
    repo: &'a dyn GitRepository,
    output: &'a dyn OutputHandler,
    config: &'a SyncConfig,
    branch_filter: Option<GlobSet>,
}

impl<'a> BranchSynchronizer<'a> {
    pub fn new(
        repo: &'a dyn GitRepository,
        output: &'a dyn OutputHandler,
        config: &'a SyncConfig,
    ) -> Result<Self> {
        let branch_filter = build_branch_filter(&config.branch_patterns)?;
        Ok(Self {
            repo,
            output,
            config,
            branch_filter,
        })
    }

    fn matches_branch_filter(&self, branch_name: &str) -> bool {
        match &self.branch_filter {
            None => true,
            Some(filter) => filter.is_match(branch_name),
        }
    }

    fn repo_path(&self) -> String {
        self.repo.path().display().to_string()
    }

    fn ctx(&self) -> StrategyContext<'_> {
        StrategyContext {
            repo: self.repo,
            output: self.output,
            config: self.config,
        }
    }

    /// Fetch, reconcile every branch, and return the accumulated result.
    pub fn sync(&self) -> SyncResult {
        let mut result = SyncResult::new();
        let repo_path = self.repo_path();

        self.output.info("Fetching from remote...", 0);
        let fetch = self.fetch_with_retry();
        if !fetch.success {
            log::debug!(
                "{}: {:?} failed: {}",
                repo_path,
                fetch.operation,
                fetch.failure_detail()
            );
            result.add_issue(SyncIssue::new(
                &repo_path,
                "",
                IssueType::Failed,
                format!("Fetch failed: {}", fetch.failure_detail()),
            ));
            return result;
        }

        let local_branches: BTreeMap<String, BranchInfo> = self
            .repo
            .local_branches()
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();
        let remote_branches: BTreeMap<String, BranchInfo> = self
            .repo
            .remote_branches(&self.config.remote_name)
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();

        if self.config.remove_stale {
            self.handle_stale_branches(&local_branches, &remote_branches, &mut result);
        }

        // Record before any checkout churn so it can be restored afterward.
        let original_branch = self.repo.current_branch();

        // Clear the tree up front so per-branch checkouts cannot fail on
        // local modifications.
        let mut pre_stashed = false;
        if self.config.stash_and_pull && !self.config.dry_run && !self.repo.is_clean() {
            let message = format!(
                "reposync-pre-stash-{}",
                Local::now().format("%Y%m%d-%H%M%S")
            );
            let stash = self.repo.stash_push(&message, true);
            if stash.success {
                pre_stashed = true;
                self.output
                    .info(&format!("Stashed working tree: {}", message), 0);
            } else {
                self.output.warning(
                    &format!("Could not stash working tree: {}", stash.failure_detail()),
                    0,
                );
            }
        }

        for (branch_name, remote_branch) in &remote_branches {
            if !self.matches_branch_filter(branch_name) {
                log::debug!("{}: skipping filtered branch {}", repo_path, branch_name);
                continue;
            }

            if local_branches.contains_key(branch_name) {
                match self.sync_existing_branch(branch_name) {
                    Some(issue) => result.add_issue(issue),
                    None => result
                        .branches_updated
                        .push((repo_path.clone(), branch_name.clone())),
                }
            } else if self.config.create_branches {
                match self.create_branch(remote_branch) {
                    CreateOutcome::Created => result
                        .branches_created
                        .push((repo_path.clone(), branch_name.clone())),
                    CreateOutcome::SkippedByAge => {}
                    CreateOutcome::Failed => result.add_issue(SyncIssue::new(
                        &repo_path,
                        branch_name,
                        IssueType::Failed,
                        "Branch creation failed",
                    )),
                }
            }
        }

        if !self.config.dry_run {
            if let Some(original) = &original_branch {
                let restore = self.repo.checkout(original);
                if !restore.success {
                    self.output.warning(
                        &format!(
                            "Could not restore branch {}: {}",
                            original,
                            restore.failure_detail()
                        ),
                        0,
                    );
                }
            }
        }

        if pre_stashed {
            let pop = self.repo.stash_pop();
            if !pop.success {
                self.output.error(
                    &format!("Stashed working tree did not reapply: {}", pop.failure_detail()),
                    0,
                );
                result.add_issue(SyncIssue::new(
                    &repo_path,
                    "",
                    IssueType::StashConflict,
                    format!("pre-sync stash did not reapply: {}", pop.failure_detail()),
                ));
            }
        }

        result.repos_processed = 1;
        result
    }

    /// Fetch from the remote with optional retry and exponential backoff.
    fn fetch_with_retry(&self) -> OperationResult {
        if self.config.dry_run {
            self.output
                .info("[dry-run] fetching remote (read-only) to analyze branches", 1);
        }
        let max_attempts = 1 + self.config.fetch_retries;
        let mut result = OperationResult::fail(OperationType::Fetch, "No fetch attempted");
        for attempt in 0..max_attempts {
            result = self.repo.fetch(&self.config.remote_name, true);
            if result.success {
                return result;
            }
            if attempt + 1 < max_attempts {
                let delay = 1u64 << attempt;
                self.output.warning(
                    &format!(
                        "Fetch failed, retrying in {}s... (attempt {}/{})",
                        delay,
                        attempt + 1,
                        max_attempts
                    ),
                    1,
                );
                std::thread::sleep(std::time::Duration::from_secs(delay));
            }
        }
        result
    }

    /// Check out (when needed), classify, and dispatch one existing branch.
    fn sync_existing_branch(&self, branch_name: &str) -> Option<SyncIssue> {
        self.output
            .info(&format!("Local branch exists: {}", branch_name), 0);

        let status = self.repo.branch_status(branch_name);
        log::debug!(
            "{}: ahead={} behind={} clean={} upstream={:?}",
            branch_name,
            status.commits_ahead,
            status.commits_behind,
            status.is_clean,
            status.remote_commit
        );

        // Only branches with something to pull need to be checked out.
        if !self.config.dry_run && status.commits_behind > 0 {
            let checkout = self.repo.checkout(branch_name);
            if !checkout.success {
                return Some(SyncIssue::new(
                    self.repo_path(),
                    branch_name,
                    IssueType::Failed,
                    format!("Checkout failed: {}", checkout.failure_detail()),
                ));
            }
        }

        let tree_clean = self.repo.is_clean();
        let state = strategy::classify(&status, tree_clean)?;
        let branch = BranchInfo {
            name: branch_name.to_string(),
            is_remote: false,
            remote_name: None,
            commit_hash: status.local_commit.clone(),
            tracking_branch: None,
            has_tracking_config: true,
        };
        strategy::execute(
            state,
            &self.ctx(),
            &branch,
            &self.config.remote_name,
            &status,
        )
    }

    /// Create a local tracking branch for a remote-only branch, subject to
    /// the age gate.
    fn create_branch(&self, remote_branch: &BranchInfo) -> CreateOutcome {
        let start_point = remote_branch.full_name();
        log::debug!(
            "considering {} at {:?}",
            start_point,
            remote_branch.commit_hash
        );

        if self.config.max_branch_age_days > 0 {
            if let Some(date) = self.repo.commit_date(&start_point) {
                let age = Utc::now().signed_duration_since(date);
                if age > Duration::days(i64::from(self.config.max_branch_age_days)) {
                    self.output.info(
                        &format!(
                            "Skipping {} (newest commit older than {} days)",
                            remote_branch.name, self.config.max_branch_age_days
                        ),
                        0,
                    );
                    return CreateOutcome::SkippedByAge;
                }
            }
        }

        self.output
            .info(&format!("Creating local branch: {}", remote_branch.name), 0);

        if self.config.dry_run {
            self.output.info(
                &format!(
                    "[dry-run] would create {} from {}",
                    remote_branch.name, start_point
                ),
                1,
            );
            return CreateOutcome::Created;
        }

        let created = self.repo.create_branch(&remote_branch.name, &start_point);
        if created.success {
            self.output
                .success(&format!("Created: {}", remote_branch.name), 1);
            CreateOutcome::Created
        } else {
            self.output.error(
                &format!(
                    "Failed to create {}: {}",
                    remote_branch.name,
                    created.failure_detail()
                ),
                1,
            );
            CreateOutcome::Failed
        }
    }

    /// Delete local branches whose upstream was removed. Local-only
    /// branches (never tracked) are left alone.
    fn handle_stale_branches(
        &self,
        local_branches: &BTreeMap<String, BranchInfo>,
        remote_branches: &BTreeMap<String, BranchInfo>,
        result: &mut SyncResult,
    ) {
        self.output.section("Checking for stale branches");

        let repo_path = self.repo_path();
        let current = self.repo.current_branch();
        let mut stale_found = false;

        for (branch_name, branch_info) in local_branches {
            if !self.matches_branch_filter(branch_name) {
                continue;
            }
            if remote_branches.contains_key(branch_name) {
                continue;
            }
            stale_found = true;

            if Some(branch_name.as_str()) == current.as_deref() {
                self.output.warning(
                    &format!(
                        "Skipping stale branch '{}' (currently checked out)",
                        branch_name
                    ),
                    0,
                );
                result.add_issue(SyncIssue::new(
                    &repo_path,
                    branch_name,
                    IssueType::Stale,
                    "currently checked out - cannot delete",
                ));
                continue;
            }

            let was_tracking =
                branch_info.tracking_branch.is_some() || branch_info.has_tracking_config;

            if was_tracking {
                self.output.warning(
                    &format!("Stale branch: {} (upstream deleted)", branch_name),
                    0,
                );
                if self.config.dry_run {
                    self.output
                        .info(&format!("[dry-run] would delete: {}", branch_name), 1);
                } else {
                    let deleted = self.repo.delete_branch(branch_name, true);
                    if deleted.success {
                        self.output
                            .success(&format!("Deleted: {}", branch_name), 1);
                    } else {
                        self.output.error(
                            &format!(
                                "Failed to delete {}: {}",
                                branch_name,
                                deleted.failure_detail()
                            ),
                            1,
                        );
                    }
                }
                result.add_issue(SyncIssue::new(
                    &repo_path,
                    branch_name,
                    IssueType::Stale,
                    "upstream deleted",
                ));
            } else {
                self.output.info(
                    &format!("Local-only branch: {} (skipping)", branch_name),
                    0,
                );
            }
        }

        if !stale_found {
            self.output.info("No stale branches found", 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeCounts;
    use crate::output::NullOutputHandler;
    use crate::test_support::FakeRepository;

    fn execute_config() -> SyncConfig {
        SyncConfig {
            dry_run: false,
            ..SyncConfig::default()
        }
    }

    fn run_sync(repo: &FakeRepository, config: &SyncConfig) -> SyncResult {
        let output = NullOutputHandler;
        BranchSynchronizer::new(repo, &output, config)
            .unwrap()
            .sync()
    }

    #[test]
    fn invalid_branch_pattern_is_a_user_error() {
        assert!(build_branch_filter(&["release/[".to_string()]).is_err());
        assert!(build_branch_filter(&[]).unwrap().is_none());
        assert!(build_branch_filter(&["release/*".to_string()]).unwrap().is_some());
    }

    #[test]
    fn fetch_failure_aborts_with_repo_level_issue() {
        let repo = FakeRepository::new();
        repo.fail_operation("fetch");
        repo.add_remote_branch("main");

        let result = run_sync(&repo, &execute_config());

        assert_eq!(result.repos_processed, 0);
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.issue_type, IssueType::Failed);
        assert_eq!(issue.branch, "");
        assert!(issue.details.starts_with("Fetch failed"));
        // Nothing beyond the single fetch attempt happened.
        assert_eq!(repo.calls(), vec!["fetch --prune origin"]);
        assert!(repo.status_queries().is_empty());
    }

    #[test]
    fn fetch_retries_until_success() {
        let repo = FakeRepository::new();
        repo.fail_fetch_times(1);
        let config = SyncConfig {
            fetch_retries: 1,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        assert!(result.issues.is_empty());
        assert_eq!(result.repos_processed, 1);
        let fetches = repo
            .calls()
            .iter()
            .filter(|c| c.starts_with("fetch"))
            .count();
        assert_eq!(fetches, 2);
    }

    #[test]
    fn fetch_retries_exhausted_still_fails() {
        let repo = FakeRepository::new();
        repo.fail_fetch_times(2);
        let config = SyncConfig {
            fetch_retries: 1,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        assert_eq!(result.repos_processed, 0);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].issue_type, IssueType::Failed);
        let fetches = repo
            .calls()
            .iter()
            .filter(|c| c.starts_with("fetch"))
            .count();
        assert_eq!(fetches, 2);
    }

    #[test]
    fn up_to_date_branch_counts_as_updated_without_checkout() {
        let repo = FakeRepository::new();
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 0, 0);

        let result = run_sync(&repo, &execute_config());

        assert!(result.issues.is_empty());
        assert_eq!(result.branches_updated.len(), 1);
        assert_eq!(result.branches_updated[0].1, "main");
        // Not behind, so no checkout beyond the final restore.
        assert_eq!(repo.mutating_calls(), vec!["checkout main"]);
    }

    #[test]
    fn behind_branch_is_checked_out_and_pulled() {
        let repo = FakeRepository::new();
        repo.set_current(Some("dev"));
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 0, 2);

        let result = run_sync(&repo, &execute_config());

        assert!(result.issues.is_empty());
        assert_eq!(
            repo.mutating_calls(),
            vec![
                "checkout main",
                "pull --rebase origin main",
                "checkout dev", // original branch restored
            ]
        );
        assert_eq!(result.branches_updated[0].1, "main");
    }

    #[test]
    fn checkout_failure_short_circuits_the_branch() {
        let repo = FakeRepository::new();
        repo.fail_operation("checkout");
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 0, 2);

        let result = run_sync(&repo, &execute_config());

        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.issue_type, IssueType::Failed);
        assert!(issue.details.starts_with("Checkout failed"));
        assert!(repo.calls().iter().all(|c| !c.starts_with("pull")));
    }

    #[test]
    fn branch_filter_limits_every_touchpoint() {
        let repo = FakeRepository::new();
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_local_branch("feature/gone", Some("origin/feature/gone"), true);
        repo.add_remote_branch("main");
        repo.add_remote_branch("feature/new");
        repo.set_status("main", 0, 0);
        let config = SyncConfig {
            branch_patterns: vec!["main".to_string()],
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        // feature/new was not created, feature/gone was not deleted as
        // stale, and only main's status was probed.
        assert!(result.branches_created.is_empty());
        assert_eq!(repo.status_queries(), vec!["main"]);
        assert!(
            repo.calls()
                .iter()
                .all(|c| !c.contains("feature/new") && !c.contains("feature/gone"))
        );
        assert!(result.issues.is_empty());
    }

    #[test]
    fn glob_patterns_match_path_style_names() {
        let repo = FakeRepository::new();
        repo.add_remote_branch("release/1.0");
        repo.add_remote_branch("feature/x");
        let config = SyncConfig {
            branch_patterns: vec!["release/*".to_string()],
            max_branch_age_days: 0,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        assert_eq!(result.branches_created.len(), 1);
        assert_eq!(result.branches_created[0].1, "release/1.0");
    }

    #[test]
    fn remote_only_branch_is_created_tracking_the_remote() {
        let repo = FakeRepository::new();
        repo.add_remote_branch("feature/x");

        let result = run_sync(&repo, &execute_config());

        assert!(
            repo.calls()
                .contains(&"branch --track feature/x origin/feature/x".to_string())
        );
        assert_eq!(result.branches_created.len(), 1);
        assert_eq!(result.branches_created[0].1, "feature/x");
    }

    #[test]
    fn old_remote_branch_is_skipped_by_the_age_gate() {
        let repo = FakeRepository::new();
        repo.add_remote_branch("feature/ancient");
        repo.set_commit_date(
            "origin/feature/ancient",
            Utc::now() - Duration::days(400),
        );

        let result = run_sync(&repo, &execute_config());

        assert!(result.branches_created.is_empty());
        assert!(result.issues.is_empty());
        assert!(repo.calls().iter().all(|c| !c.starts_with("branch --track")));
    }

    #[test]
    fn age_gate_disabled_with_zero_days() {
        let repo = FakeRepository::new();
        repo.add_remote_branch("feature/ancient");
        repo.set_commit_date(
            "origin/feature/ancient",
            Utc::now() - Duration::days(400),
        );
        let config = SyncConfig {
            max_branch_age_days: 0,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        assert_eq!(result.branches_created.len(), 1);
    }

    #[test]
    fn branch_creation_can_be_disabled() {
        let repo = FakeRepository::new();
        repo.add_remote_branch("feature/x");
        let config = SyncConfig {
            create_branches: false,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        assert!(result.branches_created.is_empty());
        assert!(result.issues.is_empty());
        assert!(repo.calls().iter().all(|c| !c.starts_with("branch --track")));
    }

    #[test]
    fn branch_creation_failure_is_recorded() {
        let repo = FakeRepository::new();
        repo.fail_operation("create_branch");
        repo.add_remote_branch("feature/x");

        let result = run_sync(&repo, &execute_config());

        assert!(result.branches_created.is_empty());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].issue_type, IssueType::Failed);
        assert_eq!(result.issues[0].details, "Branch creation failed");
    }

    #[test]
    fn checked_out_stale_branch_is_never_deleted() {
        let repo = FakeRepository::new();
        repo.set_current(Some("stale"));
        repo.add_local_branch("stale", Some("origin/stale"), true);

        let result = run_sync(&repo, &execute_config());

        let stale_issues = result.issues_of_type(IssueType::Stale);
        assert_eq!(stale_issues.len(), 1);
        assert_eq!(stale_issues[0].details, "currently checked out - cannot delete");
        assert!(repo.calls().iter().all(|c| !c.starts_with("branch -D")));
    }

    #[test]
    fn tracked_stale_branch_is_force_deleted() {
        let repo = FakeRepository::new();
        repo.add_local_branch("stale", Some("origin/stale"), true);

        let result = run_sync(&repo, &execute_config());

        assert!(repo.calls().contains(&"branch -D stale".to_string()));
        let stale_issues = result.issues_of_type(IssueType::Stale);
        assert_eq!(stale_issues.len(), 1);
        assert_eq!(stale_issues[0].details, "upstream deleted");
    }

    #[test]
    fn stale_issue_recorded_even_when_delete_fails() {
        let repo = FakeRepository::new();
        repo.fail_operation("delete_branch");
        repo.add_local_branch("stale", Some("origin/stale"), true);

        let result = run_sync(&repo, &execute_config());

        assert_eq!(result.issues_of_type(IssueType::Stale).len(), 1);
    }

    #[test]
    fn never_tracked_local_branch_is_left_alone() {
        let repo = FakeRepository::new();
        repo.add_local_branch("scratch", None, false);

        let result = run_sync(&repo, &execute_config());

        assert!(result.issues.is_empty());
        assert!(repo.calls().iter().all(|c| !c.contains("scratch")));
    }

    #[test]
    fn stale_dry_run_reports_but_does_not_delete() {
        let repo = FakeRepository::new();
        repo.add_local_branch("stale", Some("origin/stale"), true);
        let config = SyncConfig::default();
        assert!(config.dry_run);

        let result = run_sync(&repo, &config);

        assert_eq!(result.issues_of_type(IssueType::Stale).len(), 1);
        assert!(repo.mutating_calls().is_empty());
    }

    #[test]
    fn remove_stale_can_be_disabled() {
        let repo = FakeRepository::new();
        repo.add_local_branch("stale", Some("origin/stale"), true);
        let config = SyncConfig {
            remove_stale: false,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        assert!(result.issues.is_empty());
        assert!(repo.calls().iter().all(|c| !c.starts_with("branch -D")));
    }

    #[test]
    fn original_branch_is_not_restored_in_dry_run() {
        let repo = FakeRepository::new();
        repo.set_current(Some("dev"));
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 0, 2);

        let result = run_sync(&repo, &SyncConfig::default());

        assert!(repo.mutating_calls().is_empty());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn pre_stash_wraps_the_whole_pass() {
        let repo = FakeRepository::new();
        repo.set_clean(false);
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 0, 2);
        let config = SyncConfig {
            stash_and_pull: true,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        let calls = repo.mutating_calls();
        assert!(calls[0].starts_with("stash push reposync-pre-stash-"));
        assert_eq!(calls.last().unwrap(), "stash pop");
        // Pre-stash cleared the tree, so the branch fast-forwarded.
        assert!(calls.contains(&"pull --rebase origin main".to_string()));
        assert!(result.issues.is_empty());
        assert_eq!(result.branches_updated.len(), 1);
    }

    #[test]
    fn pre_stash_pop_failure_is_a_repo_scoped_conflict() {
        let repo = FakeRepository::new();
        repo.set_clean(false);
        repo.fail_operation("stash_pop");
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 0, 0);
        let config = SyncConfig {
            stash_and_pull: true,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        let conflicts = result.issues_of_type(IssueType::StashConflict);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].branch, "");
        assert!(result.has_critical_issues());
    }

    #[test]
    fn dry_run_never_calls_a_mutating_operation() {
        let repo = FakeRepository::new();
        repo.set_clean(false);
        repo.set_change_counts(ChangeCounts {
            staged: 1,
            unstaged: 1,
            untracked: 1,
        });
        repo.set_current(Some("main"));
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_local_branch("stale", Some("origin/stale"), true);
        repo.add_remote_branch("main");
        repo.add_remote_branch("feature/new");
        repo.set_status("main", 0, 3);
        let config = SyncConfig {
            stash_and_pull: true,
            ..SyncConfig::default()
        };
        assert!(config.dry_run);

        let result = run_sync(&repo, &config);

        // Status was still computed (fetch happened) and issues recorded,
        // but nothing was mutated.
        assert!(repo.mutating_calls().is_empty());
        assert!(repo.calls().iter().any(|c| c.starts_with("fetch")));
        assert_eq!(result.repos_processed, 1);
        assert_eq!(result.issues_of_type(IssueType::Stale).len(), 1);
        assert_eq!(result.branches_created.len(), 1); // would create
    }

    #[test]
    fn dirty_and_diverged_branch_yields_a_diverged_issue() {
        let repo = FakeRepository::new();
        repo.set_clean(false);
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 2, 2);

        let result = run_sync(&repo, &execute_config());

        let diverged = result.issues_of_type(IssueType::Diverged);
        assert_eq!(diverged.len(), 1);
        assert!(result.issues_of_type(IssueType::LocalChanges).is_empty());
    }

    #[test]
    fn diverged_branch_is_reported_and_untouched() {
        let repo = FakeRepository::new();
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        repo.set_status("main", 2, 2);
        let config = SyncConfig {
            stash_and_pull: true,
            ..execute_config()
        };

        let result = run_sync(&repo, &config);

        let diverged = result.issues_of_type(IssueType::Diverged);
        assert_eq!(diverged.len(), 1);
        assert!(diverged[0].details.contains("2 ahead"));
        assert!(diverged[0].details.contains("2 behind"));
        assert!(result.has_critical_issues());
        // checkout (behind>0) and the restore are fine; no pull/stash.
        assert!(repo.calls().iter().all(|c| !c.starts_with("pull")));
        assert!(repo.calls().iter().all(|c| !c.starts_with("stash")));
    }

    #[test]
    fn branch_without_upstream_is_not_dispatched() {
        let repo = FakeRepository::new();
        repo.add_local_branch("main", Some("origin/main"), true);
        repo.add_remote_branch("main");
        // No configured status: the probe returns the zero-value default
        // with has_upstream = false.
        let result = run_sync(&repo, &execute_config());

        // Falls through the strategy set without an issue; recorded as
        // updated per the accounting rule.
        assert!(result.issues.is_empty());
        assert_eq!(result.branches_updated.len(), 1);
    }
}
